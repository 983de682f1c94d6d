//! sqlreport - natural-language questions answered as CSV reports.
//!
//! This library exposes the core modules for use in integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod query;
pub mod report;
pub mod safety;
pub mod store;
