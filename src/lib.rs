//! xian-gas — prepaid natural-gas balance estimator
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod estimator;
pub mod publisher;
pub mod sensor;
pub mod storage;
pub mod types;
