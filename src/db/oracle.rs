//! Oracle execution adapter.
//!
//! The `oracle` crate is a blocking ODPI-C binding, so every call runs on
//! tokio's blocking pool. The session pool itself is built on first use.

use crate::config::{OracleConfig, OracleTarget};
use crate::db::{Dialect, DialectAdapter, Row, Value};
use crate::error::{PilotError, Result};
use crate::sql::{derive_count_query, ensure_fetch_first, strip_terminator};
use async_trait::async_trait;
use oracle::pool::{Pool, PoolBuilder};
use oracle::sql_type::OracleType;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Oracle execution adapter.
pub struct OracleAdapter {
    target: OracleTarget,
    user: String,
    password: String,
    max_connections: u32,
    statement_timeout: Duration,
    pool: OnceCell<Arc<Pool>>,
}

impl OracleAdapter {
    /// Validates the descriptor and credentials without connecting.
    pub fn from_config(config: &OracleConfig, statement_timeout: Duration) -> Result<Self> {
        let target = config.target()?;
        let (user, password) = config.credentials()?;

        Ok(Self {
            target,
            user,
            password,
            max_connections: config.pool_size(),
            statement_timeout,
            pool: OnceCell::new(),
        })
    }

    async fn pool(&self) -> Result<Arc<Pool>> {
        let pool = self
            .pool
            .get_or_try_init(|| async {
                let user = self.user.clone();
                let password = self.password.clone();
                let connect_string = self.target.connect_string();
                let max_connections = self.max_connections;
                let server_display = self.target.to_string();

                let pool = tokio::task::spawn_blocking(move || {
                    PoolBuilder::new(user, password, connect_string)
                        .max_connections(max_connections)
                        .build()
                })
                .await
                .map_err(|e| PilotError::internal(format!("Oracle worker failed: {e}")))?
                .map_err(|e| {
                    PilotError::execution(format!("Cannot connect to Oracle at {server_display}: {e}"))
                })?;

                info!(server = %server_display, max_connections, "created oracle session pool");
                Ok::<_, PilotError>(Arc::new(pool))
            })
            .await?;

        Ok(Arc::clone(pool))
    }
}

#[async_trait]
impl DialectAdapter for OracleAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    async fn execute(&self, sql: &str, row_limit: u32) -> Result<Vec<Row>> {
        let statement = prepare_statement(sql, row_limit);
        let pool = self.pool().await?;
        let timeout = self.statement_timeout;
        let limit = row_limit as usize;
        let start = Instant::now();

        let rows = tokio::task::spawn_blocking(move || run_query(&pool, &statement, timeout, limit))
            .await
            .map_err(|e| PilotError::internal(format!("Oracle worker failed: {e}")))??;

        debug!(
            dialect = "oracle",
            rows = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "executed statement"
        );
        Ok(rows)
    }

    async fn count(&self, sql: &str) -> Result<u64> {
        let query = derive_count_query(sql, Dialect::Oracle);
        debug!(sql = %query, "counting rows");

        let pool = self.pool().await?;
        let timeout = self.statement_timeout;

        tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(oracle_error)?;
            apply_call_timeout(&conn, timeout);
            let row = conn.query_row(&query, &[]).map_err(oracle_error)?;
            let total: i64 = row.get(0usize).map_err(oracle_error)?;
            Ok::<_, PilotError>(total.max(0) as u64)
        })
        .await
        .map_err(|e| PilotError::internal(format!("Oracle worker failed: {e}")))?
    }
}

/// Drops the terminator and bounds the statement with `FETCH FIRST` unless
/// it already carries one.
fn prepare_statement(sql: &str, row_limit: u32) -> String {
    ensure_fetch_first(strip_terminator(sql), row_limit)
}

fn run_query(pool: &Pool, sql: &str, timeout: Duration, limit: usize) -> Result<Vec<Row>> {
    let conn = pool.get().map_err(oracle_error)?;
    apply_call_timeout(&conn, timeout);

    let result_set = conn.query(sql, &[]).map_err(oracle_error)?;
    let columns: Vec<(String, OracleType)> = result_set
        .column_info()
        .iter()
        .map(|info| (info.name().to_string(), info.oracle_type().clone()))
        .collect();

    let mut rows = Vec::new();
    for row in result_set.take(limit) {
        let row = row.map_err(oracle_error)?;
        let mut out = Row::with_capacity(columns.len());
        for (i, (name, oracle_type)) in columns.iter().enumerate() {
            out.push(name.as_str(), convert_value(&row, i, oracle_type));
        }
        rows.push(out);
    }

    Ok(rows)
}

fn apply_call_timeout(conn: &oracle::Connection, timeout: Duration) {
    if let Err(e) = conn.set_call_timeout(Some(timeout)) {
        warn!("call timeout not applied: {e}");
    }
}

/// Converts a single column value from an Oracle row to our Value type.
fn convert_value(row: &oracle::Row, index: usize, oracle_type: &OracleType) -> Value {
    match oracle_type {
        OracleType::Number(_, _)
        | OracleType::Int64
        | OracleType::UInt64
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => {
            if let Ok(v) = row.get::<_, Option<i64>>(index) {
                return Value::from(v);
            }
            if let Ok(v) = row.get::<_, Option<f64>>(index) {
                return Value::from(v);
            }
            text_at(row, index)
        }
        OracleType::Boolean => row
            .get::<_, Option<bool>>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        _ => text_at(row, index),
    }
}

fn text_at(row: &oracle::Row, index: usize) -> Value {
    row.get::<_, Option<String>>(index)
        .map(Value::from)
        .unwrap_or(Value::Null)
}

fn oracle_error(error: oracle::Error) -> PilotError {
    PilotError::execution(error.to_string())
}
