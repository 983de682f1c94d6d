//! Query execution and classification for sqlreport.
//!
//! Isolates the read-only gate from the orchestrator so it can be tested on
//! its own.

pub mod executor;

pub use executor::QueryExecutor;
