//! The question-to-result pipeline.
//!
//! A request moves through fixed stages:
//!
//! ```text
//! Drafting -> Sanitizing -> RankAdjusting -> LimitEnforcing -> Normalizing
//!          -> Validating -> { Rejected | DryRunDone | Executing } -> Done
//! ```
//!
//! Validation rejections and backend failures become ordinary responses.
//! Only configuration, dialect, LLM and retrieval problems are returned as
//! errors.

pub mod summary;

pub use summary::build_summary;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::{AdapterProvider, Dialect, DialectAdapter, EngineRegistry, Row};
use crate::error::{PilotError, Result};
use crate::llm::{
    build_user_prompt, create_collaborators, sql_system_prompt, CorrectionRequest, RankCorrector,
    SqlDrafter,
};
use crate::rag::{build_context, ContextRetriever, EmptyRetriever, InMemoryRetriever, SourceChunk};
use crate::safety::{lint, validate, SecurityPolicy};
use crate::sql::{
    enforce_limit, has_window_function, sanitize, uppercase_outside_literals,
    RankDirective, RANK_POLICY,
};
use summary::{failure_summary, rejected_summary, DRY_RUN_SUMMARY};

/// Row limit used when the request does not name one.
pub const DEFAULT_ROW_LIMIT: u32 = 200;
/// Upper bound for retrieved chunks per namespace.
pub const MAX_TOP_K: usize = 20;

/// A natural-language question to answer with SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// Target dialect; the configured default when absent.
    #[serde(default)]
    pub dialect: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub row_limit: Option<u32>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub include_total: bool,
    #[serde(default)]
    pub include_sources: bool,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            dialect: None,
            top_k: None,
            row_limit: None,
            dry_run: false,
            include_total: false,
            include_sources: false,
        }
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = Some(row_limit);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn include_total(mut self, include_total: bool) -> Self {
        self.include_total = include_total;
        self
    }

    pub fn include_sources(mut self, include_sources: bool) -> Self {
        self.include_sources = include_sources;
        self
    }
}

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Rejected,
    DryRun,
    Executed,
    Failed,
}

/// The answer to a [`QueryRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    /// Final SQL, also present when rejected.
    pub sql: String,
    pub summary: String,
    pub results: Vec<Row>,
    pub total_rows: Option<u64>,
    pub is_limited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceChunk>>,
    /// Rejection reasons and advisory notes.
    pub warnings: Vec<String>,
    pub outcome: Outcome,
}

impl QueryResponse {
    fn without_rows(sql: String, summary: String, outcome: Outcome) -> Self {
        Self {
            sql,
            summary,
            results: Vec::new(),
            total_rows: None,
            is_limited: false,
            sources: None,
            warnings: Vec::new(),
            outcome,
        }
    }
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Drafting,
    Sanitizing,
    RankAdjusting,
    LimitEnforcing,
    Normalizing,
    Validating,
    Rejected,
    DryRunDone,
    Executing,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drafting => "drafting",
            Self::Sanitizing => "sanitizing",
            Self::RankAdjusting => "rank_adjusting",
            Self::LimitEnforcing => "limit_enforcing",
            Self::Normalizing => "normalizing",
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::DryRunDone => "dry_run_done",
            Self::Executing => "executing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(stage: PipelineStage, sql: &str) {
    debug!(stage = %stage, sql, "pipeline stage");
}

/// Turns questions into validated, bounded, executed SQL.
pub struct Pipeline {
    drafter: Arc<dyn SqlDrafter>,
    corrector: Arc<dyn RankCorrector>,
    retriever: Arc<dyn ContextRetriever>,
    adapters: Arc<dyn AdapterProvider>,
    policy: SecurityPolicy,
    default_dialect: String,
    default_top_k: usize,
    max_rows: u32,
}

impl Pipeline {
    /// Creates a pipeline with the default policy, Postgres as the default
    /// dialect and a row ceiling of [`DEFAULT_ROW_LIMIT`].
    pub fn new(
        drafter: Arc<dyn SqlDrafter>,
        corrector: Arc<dyn RankCorrector>,
        retriever: Arc<dyn ContextRetriever>,
        adapters: Arc<dyn AdapterProvider>,
    ) -> Self {
        Self {
            drafter,
            corrector,
            retriever,
            adapters,
            policy: SecurityPolicy::default(),
            default_dialect: Dialect::default().as_str().to_string(),
            default_top_k: 5,
            max_rows: DEFAULT_ROW_LIMIT,
        }
    }

    /// Builds every collaborator from configuration.
    ///
    /// No database connection is opened here; engines are created on first
    /// use of their dialect.
    pub fn from_config(config: &Config, force_mock_llm: bool) -> Result<Self> {
        let collaborators = create_collaborators(&config.llm, force_mock_llm)?;

        let retriever: Arc<dyn ContextRetriever> = match &config.retrieval.chunks_file {
            Some(path) => Arc::new(InMemoryRetriever::from_json_file(path)?),
            None => Arc::new(EmptyRetriever),
        };

        let adapters: Arc<dyn AdapterProvider> = Arc::new(EngineRegistry::from_config(config));

        Ok(Self::new(
            collaborators.drafter,
            collaborators.corrector,
            retriever,
            adapters,
        )
        .with_policy(SecurityPolicy::new(config.safety.allow_dml))
        .with_default_dialect(config.default_dialect.clone())
        .with_default_top_k(config.retrieval.top_k)
        .with_max_rows(config.safety.max_rows))
    }

    pub fn with_policy(mut self, policy: SecurityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_default_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.default_dialect = dialect.into();
        self
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Sets the row ceiling; zero is treated as one.
    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    /// Resolves the effective row limit for a request.
    pub fn row_limit_for(&self, request: &QueryRequest) -> u32 {
        request
            .row_limit
            .unwrap_or(DEFAULT_ROW_LIMIT)
            .clamp(1, self.max_rows)
    }

    /// Resolves the effective retrieval depth for a request.
    pub fn top_k_for(&self, request: &QueryRequest) -> usize {
        request
            .top_k
            .unwrap_or(self.default_top_k)
            .clamp(1, MAX_TOP_K)
    }

    /// Runs one request through every stage.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown dialect, a broken connection
    /// configuration, or a failing drafter or retriever. Rejected SQL and
    /// backend failures are reported in the response instead.
    pub async fn handle(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let start = Instant::now();
        let dialect = Dialect::parse(request.dialect.as_deref().unwrap_or(&self.default_dialect))?;
        let row_limit = self.row_limit_for(request);
        let top_k = self.top_k_for(request);

        info!(
            dialect = %dialect,
            row_limit,
            top_k,
            dry_run = request.dry_run,
            "Handling question"
        );

        enter(PipelineStage::Drafting, "");
        let (context, sources) = build_context(self.retriever.as_ref(), &request.question, top_k).await?;
        let system = sql_system_prompt(dialect);
        let user = build_user_prompt(&request.question, &context, row_limit, dialect);
        let draft = self.drafter.draft(&system, &user).await?;

        enter(PipelineStage::Sanitizing, &draft);
        let mut sql = sanitize(&draft);

        if let Some(directive) = RankDirective::from_question(&request.question) {
            enter(PipelineStage::RankAdjusting, &sql);
            debug!(ordinal = directive.ordinal, "Exact-rank question");
            let corrected = self
                .corrector
                .correct(&CorrectionRequest {
                    question: &request.question,
                    sql: &sql,
                    policy: RANK_POLICY,
                    context: &context,
                    dialect,
                    row_limit,
                })
                .await?;
            sql = sanitize(&corrected);
        }

        enter(PipelineStage::LimitEnforcing, &sql);
        let sql = enforce_limit(&sql, row_limit, dialect);

        enter(PipelineStage::Normalizing, &sql);
        let sql = uppercase_outside_literals(&sql);

        enter(PipelineStage::Validating, &sql);
        let verdict = validate(&sql, &self.policy);
        let sources = request.include_sources.then_some(sources);

        if !verdict.ok {
            enter(PipelineStage::Rejected, &sql);
            warn!(reasons = %verdict.reasons(), "SQL rejected");
            let mut response =
                QueryResponse::without_rows(sql, rejected_summary(&verdict.reasons()), Outcome::Rejected);
            response.warnings = verdict.warnings;
            response.sources = sources;
            return Ok(response);
        }

        let warnings = lint(&sql, dialect);

        if request.dry_run {
            enter(PipelineStage::DryRunDone, &sql);
            let mut response =
                QueryResponse::without_rows(sql, DRY_RUN_SUMMARY.to_string(), Outcome::DryRun);
            response.warnings = warnings;
            return Ok(response);
        }

        enter(PipelineStage::Executing, &sql);
        let adapter = self.adapters.adapter(dialect).await?;
        let mut response = match self
            .execute(adapter.as_ref(), &sql, row_limit, request.include_total)
            .await
        {
            Ok((rows, total)) => {
                let (summary, is_limited) = build_summary(rows.len(), total, row_limit);
                QueryResponse {
                    sql,
                    summary,
                    results: rows,
                    total_rows: total,
                    is_limited,
                    sources: None,
                    warnings: Vec::new(),
                    outcome: Outcome::Executed,
                }
            }
            Err(e @ PilotError::Config(_)) => return Err(e),
            Err(e) => {
                warn!(dialect = %dialect, error = %e, "Execution failed");
                QueryResponse::without_rows(sql, failure_summary(&e), Outcome::Failed)
            }
        };
        response.warnings = warnings;
        response.sources = sources;

        enter(PipelineStage::Done, &response.sql);
        info!(
            outcome = ?response.outcome,
            rows = response.results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Question handled"
        );
        Ok(response)
    }

    /// Counts (when asked and safe) and then fetches the rows.
    async fn execute(
        &self,
        adapter: &dyn DialectAdapter,
        sql: &str,
        row_limit: u32,
        include_total: bool,
    ) -> Result<(Vec<Row>, Option<u64>)> {
        let total = if !include_total {
            None
        } else if has_window_function(sql) {
            debug!("Skipping total count for a query with a window function");
            None
        } else {
            Some(adapter.count(sql).await?)
        };

        let rows = adapter.execute(sql, row_limit).await?;
        Ok((rows, total))
    }
}
