//! Mock execution adapter for testing.
//!
//! Returns canned rows and records every call, so tests can assert that a
//! rejected or dry-run request never reached the backend.

use super::{AdapterProvider, Dialect, DialectAdapter, Row};
use crate::error::{PilotError, Result};
use crate::sql::derive_count_query;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A call observed by [`MockAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Execute { sql: String, row_limit: u32 },
    /// Carries the derived `COUNT(*)` statement, as a real backend would run it.
    Count { sql: String },
}

/// A mock adapter that returns predefined rows.
#[derive(Debug)]
pub struct MockAdapter {
    dialect: Dialect,
    rows: Vec<Row>,
    total: Option<u64>,
    failure: Option<String>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockAdapter {
    /// Creates a mock adapter with no rows.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            rows: Vec::new(),
            total: None,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the rows returned by `execute` (capped at the row limit).
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Sets the value returned by `count`; defaults to the number of rows.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Makes every call fail with an execution error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Returns the calls seen so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().clone()
    }

    /// Returns the number of `execute` calls seen so far.
    pub fn execute_calls(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, MockCall::Execute { .. }))
            .count()
    }

    /// Returns the number of `count` calls seen so far.
    pub fn count_calls(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, MockCall::Count { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MockCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_failure(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(PilotError::execution(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DialectAdapter for MockAdapter {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, sql: &str, row_limit: u32) -> Result<Vec<Row>> {
        self.lock().push(MockCall::Execute {
            sql: sql.to_string(),
            row_limit,
        });
        self.check_failure()?;
        Ok(self.rows.iter().take(row_limit as usize).cloned().collect())
    }

    async fn count(&self, sql: &str) -> Result<u64> {
        self.lock().push(MockCall::Count {
            sql: derive_count_query(sql, self.dialect),
        });
        self.check_failure()?;
        Ok(self.total.unwrap_or(self.rows.len() as u64))
    }
}

/// Hands out pre-built adapters; dialects without one are configuration errors.
#[derive(Default)]
pub struct StaticAdapterProvider {
    adapters: HashMap<Dialect, Arc<dyn DialectAdapter>>,
}

impl StaticAdapterProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the adapter under its own dialect.
    pub fn with_adapter(mut self, adapter: Arc<dyn DialectAdapter>) -> Self {
        self.adapters.insert(adapter.dialect(), adapter);
        self
    }
}

#[async_trait]
impl AdapterProvider for StaticAdapterProvider {
    async fn adapter(&self, dialect: Dialect) -> Result<Arc<dyn DialectAdapter>> {
        self.adapters
            .get(&dialect)
            .cloned()
            .ok_or_else(|| PilotError::config(format!("No {dialect} connection configured")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: i64) -> Vec<Row> {
        (0..n).map(|i| Row::new().with("N", i)).collect()
    }

    #[tokio::test]
    async fn test_mock_caps_rows_and_records() {
        let adapter = MockAdapter::new(Dialect::Postgres).with_rows(rows(10));

        let result = adapter.execute("SELECT N FROM T", 3).await.unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(
            adapter.calls(),
            vec![MockCall::Execute {
                sql: "SELECT N FROM T".to_string(),
                row_limit: 3
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_count_defaults_to_row_count() {
        let adapter = MockAdapter::new(Dialect::Oracle).with_rows(rows(4));
        assert_eq!(adapter.count("SELECT 1").await.unwrap(), 4);

        let adapter = adapter.with_total(99);
        assert_eq!(adapter.count("SELECT 1").await.unwrap(), 99);
        assert_eq!(adapter.count_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let adapter = MockAdapter::new(Dialect::Postgres).failing("ORA-00942: table or view does not exist");
        let err = adapter.execute("SELECT 1", 10).await.unwrap_err();
        assert!(matches!(err, PilotError::Execution(_)));
        assert_eq!(adapter.execute_calls(), 1);
    }

    #[tokio::test]
    async fn test_static_provider() {
        let adapter: Arc<dyn DialectAdapter> = Arc::new(MockAdapter::new(Dialect::Oracle));
        let provider = StaticAdapterProvider::new().with_adapter(adapter);

        let found = provider.adapter(Dialect::Oracle).await.unwrap();
        assert_eq!(found.dialect(), Dialect::Oracle);

        let missing = provider.adapter(Dialect::Postgres).await;
        assert!(matches!(missing, Err(PilotError::Config(_))));
    }
}
