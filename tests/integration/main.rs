//! Integration tests: the invoice client and coordinator against a local
//! mock of the gas company's API, and the Home Assistant publisher against
//! a local mock of its state endpoint.

mod fetch_flow;
mod publish_flow;
