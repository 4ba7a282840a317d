//! Draft and rank-correction collaborators.
//!
//! The pipeline never talks to an [`LlmClient`] directly; it asks a
//! [`SqlDrafter`] for a draft and a [`RankCorrector`] for exact-rank fixes.
//! Which implementations are bound is decided once at construction.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::db::Dialect;
use crate::error::Result;
use crate::llm::prompt::{build_correction_prompt, sql_system_prompt};
use crate::llm::types::Message;
use crate::llm::LlmClient;
use crate::sql::rank::minimal_correction;
use crate::sql::sanitize;

/// Harmless query returned when no drafting capability is configured.
pub const PLACEHOLDER_SQL: &str = "SELECT 1 AS example;";

/// Produces draft SQL from a system prompt and a user prompt.
#[async_trait]
pub trait SqlDrafter: Send + Sync {
    async fn draft(&self, system: &str, user: &str) -> Result<String>;
}

/// Drafts through an LLM.
pub struct LlmDrafter {
    client: Arc<dyn LlmClient>,
}

impl LlmDrafter {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SqlDrafter for LlmDrafter {
    async fn draft(&self, system: &str, user: &str) -> Result<String> {
        let messages = [Message::system(system), Message::user(user)];
        let response = self.client.complete(&messages).await?;
        Ok(response.trim().to_string())
    }
}

/// Returns [`PLACEHOLDER_SQL`] for every question.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderDrafter;

#[async_trait]
impl SqlDrafter for PlaceholderDrafter {
    async fn draft(&self, _system: &str, _user: &str) -> Result<String> {
        Ok(PLACEHOLDER_SQL.to_string())
    }
}

/// Everything a corrector gets for one exact-rank question.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionRequest<'a> {
    pub question: &'a str,
    pub sql: &'a str,
    pub policy: &'a str,
    pub context: &'a str,
    pub dialect: Dialect,
    pub row_limit: u32,
}

/// Rewrites a draft that answers an exact-rank question.
#[async_trait]
pub trait RankCorrector: Send + Sync {
    async fn correct(&self, request: &CorrectionRequest<'_>) -> Result<String>;
}

/// Applies only the mechanical limiting fix.
///
/// The policy text is accepted but not enforced; restructuring the query
/// is left to [`LlmRankCorrector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedCorrector;

#[async_trait]
impl RankCorrector for RuleBasedCorrector {
    async fn correct(&self, request: &CorrectionRequest<'_>) -> Result<String> {
        debug!(
            policy_chars = request.policy.len(),
            "rule-based rank correction; policy not enforced"
        );
        Ok(minimal_correction(
            request.sql,
            request.dialect,
            request.row_limit,
        ))
    }
}

/// Asks the LLM to restructure the query under the policy, then applies the
/// mechanical limiting fix to its answer.
pub struct LlmRankCorrector {
    client: Arc<dyn LlmClient>,
}

impl LlmRankCorrector {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RankCorrector for LlmRankCorrector {
    async fn correct(&self, request: &CorrectionRequest<'_>) -> Result<String> {
        let system = format!("{}\n{}", sql_system_prompt(request.dialect), request.policy);
        let user = build_correction_prompt(
            request.question,
            request.context,
            request.sql,
            request.dialect,
        );

        let response = self
            .client
            .complete(&[Message::system(system), Message::user(user)])
            .await?;

        let rewritten = sanitize(&response);
        let base = if rewritten.trim_end_matches(';').trim().is_empty() {
            debug!("empty rank correction; keeping the draft");
            request.sql.to_string()
        } else {
            rewritten
        };

        Ok(minimal_correction(&base, request.dialect, request.row_limit))
    }
}
