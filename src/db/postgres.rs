//! PostgreSQL execution adapter.
//!
//! Provides the `PostgresAdapter` struct that implements the `DialectAdapter`
//! trait for PostgreSQL using sqlx. Statements go over the simple-query
//! protocol so every column arrives as text and NUMERIC, DATE and friends
//! decode without per-type feature flags.

use crate::config::PostgresConfig;
use crate::db::{Dialect, DialectAdapter, Row, Value};
use crate::error::{PilotError, Result};
use crate::sql::{derive_count_query, strip_terminator};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long to wait for a pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL execution adapter.
#[derive(Debug)]
pub struct PostgresAdapter {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PostgresAdapter {
    /// Creates the adapter with a lazily connecting pool.
    ///
    /// Only the URL is validated here; connection failures surface on first
    /// execution. Every pooled session starts with `statement_timeout` set.
    pub fn connect_lazy(config: &PostgresConfig, statement_timeout: Duration) -> Result<Self> {
        let url = config.connection_url()?;
        let options = url
            .parse::<PgConnectOptions>()
            .map_err(|e| PilotError::config(format!("Invalid DATABASE_URL: {e}")))?
            .options([("statement_timeout", statement_timeout.as_millis())]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_lazy_with(options);

        debug!(server = %config.display_string(), "created postgres pool");
        Ok(Self {
            pool,
            statement_timeout,
        })
    }

    /// Creates a new adapter from an existing connection pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    /// Runs one statement on the pool.
    ///
    /// The server enforces `statement_timeout`; the client-side deadline
    /// also covers pools built with [`Self::from_pool`].
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<PgRow>> {
        let deadline = self.statement_timeout + Duration::from_secs(ACQUIRE_TIMEOUT_SECS);

        tokio::time::timeout(deadline, sqlx::raw_sql(sql).fetch_all(&self.pool))
            .await
            .map_err(|_| {
                PilotError::execution(format!(
                    "Query timed out after {} seconds",
                    deadline.as_secs()
                ))
            })?
            .map_err(|e| PilotError::execution(format_query_error(e)))
    }

    /// Closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DialectAdapter for PostgresAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute(&self, sql: &str, row_limit: u32) -> Result<Vec<Row>> {
        let sql = strip_terminator(sql);
        let start = Instant::now();

        let result = self.fetch_rows(sql).await?;

        let limit = row_limit as usize;
        if result.len() > limit {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                result.len(),
                limit
            );
        }

        let rows: Vec<Row> = result.iter().take(limit).map(convert_row).collect();

        debug!(
            dialect = "postgres",
            rows = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "executed statement"
        );
        Ok(rows)
    }

    async fn count(&self, sql: &str) -> Result<u64> {
        let query = derive_count_query(sql, Dialect::Postgres);
        debug!(sql = %query, "counting rows");

        let rows = self.fetch_rows(&query).await?;
        let total = rows
            .first()
            .and_then(|row| text_at(row, 0))
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| PilotError::execution("COUNT(*) returned no value"))?;

        Ok(total)
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    let mut out = Row::with_capacity(row.columns().len());
    for (i, col) in row.columns().iter().enumerate() {
        out.push(col.name(), convert_value(row, i, col.type_info().name()));
    }
    out
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        // NUMERIC, DATE, TIMESTAMP, JSON, UUID ... keep their text form.
        _ => text_at(row, index).map(Value::String).unwrap_or(Value::Null),
    }
}

fn text_at(row: &PgRow, index: usize) -> Option<String> {
    row.try_get_unchecked::<Option<String>, _>(index)
        .ok()
        .flatten()
}

/// Formats a query error with hints if available.
fn format_query_error(error: sqlx::Error) -> String {
    let mut result = String::new();

    if let Some(db_error) = error.as_database_error() {
        result.push_str("ERROR: ");
        result.push_str(db_error.message());

        if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
            if let Some(detail) = pg_error.detail() {
                result.push_str("\n  DETAIL: ");
                result.push_str(detail);
            }

            if let Some(hint) = pg_error.hint() {
                result.push_str("\n  HINT: ");
                result.push_str(hint);
            }

            if let Some(table) = pg_error.table() {
                result.push_str("\n  TABLE: ");
                result.push_str(table);
            }

            if let Some(column) = pg_error.column() {
                result.push_str("\n  COLUMN: ");
                result.push_str(column);
            }
        }
    } else {
        let error_str = error.to_string();
        let lower = error_str.to_lowercase();
        result = if lower.contains("connection refused") || lower.contains("could not connect") {
            format!("Cannot connect to PostgreSQL: {error_str}")
        } else if lower.contains("timed out") || lower.contains("timeout") {
            format!("PostgreSQL did not respond in time: {error_str}")
        } else {
            error_str
        };
    }

    result
}
