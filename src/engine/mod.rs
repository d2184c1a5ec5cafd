//! Poll engine.
//!
//! The coordinator that turns periodic fetches into a stable reading.

pub mod coordinator;
