//! sqlpilot - natural-language questions to safe, bounded SQL.
//!
//! The [`pipeline::Pipeline`] drafts SQL for a question through an LLM,
//! passes it through textual safety nets and runs it against Postgres or
//! Oracle. This library exposes the core modules for use in integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod rag;
pub mod safety;
pub mod sql;
