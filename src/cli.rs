//! Command-line argument parsing for sqlpilot.

use crate::pipeline::QueryRequest;
use clap::Parser;
use std::path::PathBuf;

/// Answer a natural-language question with safe, bounded SQL.
#[derive(Parser, Debug)]
#[command(name = "sqlpilot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The question to answer
    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Target dialect (oracle or postgres); defaults to the configured one
    #[arg(short = 'd', long, value_name = "DIALECT")]
    pub dialect: Option<String>,

    /// Maximum number of rows to return (capped by safety.max_rows)
    #[arg(short = 'n', long, value_name = "ROWS")]
    pub row_limit: Option<u32>,

    /// Number of context chunks to retrieve (1-20)
    #[arg(short = 'k', long, value_name = "K")]
    pub top_k: Option<usize>,

    /// Build and validate the SQL without executing it
    #[arg(long)]
    pub dry_run: bool,

    /// Also count the total number of matching rows
    #[arg(long)]
    pub include_total: bool,

    /// Include the retrieved context chunks in the response
    #[arg(long)]
    pub include_sources: bool,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use the mock LLM instead of the configured provider
    #[arg(long)]
    pub mock_llm: bool,

    /// Write logs to the state-directory log file instead of stderr
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Builds the pipeline request from the arguments.
    pub fn to_request(&self) -> QueryRequest {
        QueryRequest {
            question: self.question.clone(),
            dialect: self.dialect.clone(),
            top_k: self.top_k,
            row_limit: self.row_limit,
            dry_run: self.dry_run,
            include_total: self.include_total,
            include_sources: self.include_sources,
        }
    }
}
