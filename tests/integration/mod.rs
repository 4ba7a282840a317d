//! Integration tests for sqlpilot.

pub mod common;
pub mod pipeline_test;
pub mod postgres_test;
pub mod rank_test;
pub mod safety_test;
