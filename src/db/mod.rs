//! Dialect execution adapters.
//!
//! Each supported backend implements [`DialectAdapter`]. Adapters are handed
//! out by an [`AdapterProvider`]; the production provider is the
//! [`EngineRegistry`], which creates one pooled adapter per dialect on first
//! use and shares it for the life of the process.

mod mock;
#[cfg(feature = "oracle")]
mod oracle;
mod postgres;
mod registry;
mod types;

pub use mock::{MockAdapter, MockCall, StaticAdapterProvider};
#[cfg(feature = "oracle")]
pub use oracle::OracleAdapter;
pub use postgres::PostgresAdapter;
pub use registry::EngineRegistry;
pub use types::{Row, Value};

use crate::error::{PilotError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Oracle: no `LIMIT`, rows are bounded with `FETCH FIRST n ROWS ONLY`.
    Oracle,
    /// PostgreSQL: rows are bounded with `LIMIT n`.
    #[default]
    Postgres,
}

impl Dialect {
    /// Returns the dialect as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::Postgres => "postgres",
        }
    }

    /// Parses a dialect name, trimming and ignoring case.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "oracle" => Ok(Self::Oracle),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(PilotError::unsupported_dialect(other)),
        }
    }

    /// Returns true if the dialect understands `LIMIT n`.
    pub fn has_native_limit(&self) -> bool {
        matches!(self, Self::Postgres)
    }

    /// Returns the dialect's row-limiting clause for `n` rows.
    pub fn limit_clause(&self, n: u32) -> String {
        match self {
            Self::Oracle => format!("FETCH FIRST {n} ROWS ONLY"),
            Self::Postgres => format!("LIMIT {n}"),
        }
    }
}

impl FromStr for Dialect {
    type Err = PilotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes finalized SQL against one backend.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait DialectAdapter: Send + Sync {
    /// The dialect this adapter speaks.
    fn dialect(&self) -> Dialect;

    /// Executes the statement and returns at most `row_limit` rows.
    ///
    /// A trailing terminator is stripped before dispatch.
    async fn execute(&self, sql: &str, row_limit: u32) -> Result<Vec<Row>>;

    /// Returns the total number of rows the statement would produce without
    /// its limiting clause and final ordering.
    ///
    /// Takes the finalized statement; the adapter derives the count query.
    async fn count(&self, sql: &str) -> Result<u64>;
}

/// Hands out the adapter for a dialect.
#[async_trait]
pub trait AdapterProvider: Send + Sync {
    /// Returns the shared adapter, creating it on first use.
    ///
    /// Fails with a configuration error when the dialect's connection
    /// descriptor is missing or malformed.
    async fn adapter(&self, dialect: Dialect) -> Result<Arc<dyn DialectAdapter>>;
}
