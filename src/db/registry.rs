//! Process-wide execution engines, one per dialect.
//!
//! Each engine is created on first use behind a `tokio::sync::OnceCell`, so
//! concurrent first requests build it exactly once. A failed creation is not
//! stored; the next request for that dialect tries again.

use super::{AdapterProvider, Dialect, DialectAdapter, PostgresAdapter};
use crate::config::{OracleConfig, PostgresConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

type Engine = Arc<dyn DialectAdapter>;

/// Lazily created adapters for every supported dialect.
pub struct EngineRegistry {
    postgres_config: PostgresConfig,
    oracle_config: OracleConfig,
    statement_timeout: Duration,
    postgres: OnceCell<Engine>,
    oracle: OnceCell<Engine>,
}

impl EngineRegistry {
    /// Creates an empty registry. No connection is attempted here.
    pub fn new(
        postgres_config: PostgresConfig,
        oracle_config: OracleConfig,
        statement_timeout: Duration,
    ) -> Self {
        Self {
            postgres_config,
            oracle_config,
            statement_timeout,
            postgres: OnceCell::new(),
            oracle: OnceCell::new(),
        }
    }

    /// Creates a registry from the loaded configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            config.postgres.clone(),
            config.oracle.clone(),
            config.safety.statement_timeout(),
        )
    }

    /// Returns true once the dialect's engine has been created.
    pub fn is_initialized(&self, dialect: Dialect) -> bool {
        self.cell(dialect).initialized()
    }

    fn cell(&self, dialect: Dialect) -> &OnceCell<Engine> {
        match dialect {
            Dialect::Postgres => &self.postgres,
            Dialect::Oracle => &self.oracle,
        }
    }

    fn create(&self, dialect: Dialect) -> Result<Engine> {
        let engine: Engine = match dialect {
            Dialect::Postgres => Arc::new(PostgresAdapter::connect_lazy(
                &self.postgres_config,
                self.statement_timeout,
            )?),
            #[cfg(feature = "oracle")]
            Dialect::Oracle => Arc::new(super::OracleAdapter::from_config(
                &self.oracle_config,
                self.statement_timeout,
            )?),
            #[cfg(not(feature = "oracle"))]
            Dialect::Oracle => {
                // Still validate the descriptor so misconfiguration reads the same.
                self.oracle_config.target()?;
                return Err(crate::error::PilotError::config(
                    "Oracle support is not compiled in; rebuild with the `oracle` feature",
                ));
            }
        };

        info!(dialect = %dialect, "initialized execution engine");
        Ok(engine)
    }
}

#[async_trait]
impl AdapterProvider for EngineRegistry {
    async fn adapter(&self, dialect: Dialect) -> Result<Arc<dyn DialectAdapter>> {
        let engine = self
            .cell(dialect)
            .get_or_try_init(|| async { self.create(dialect) })
            .await?;
        Ok(Arc::clone(engine))
    }
}
