//! Integration tests for sqlreport.

pub mod common;
pub mod pipeline_test;
pub mod query_test;
pub mod report_test;
pub mod store_test;
