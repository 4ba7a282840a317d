//! LLM integration for sqlpilot.
//!
//! Provides the [`LlmClient`] trait, the OpenAI and mock clients, prompt
//! construction, and the drafter/corrector collaborators built on top.

pub mod drafter;
pub mod factory;
pub mod mock;
pub mod openai;
pub mod prompt;
pub mod types;

pub use drafter::{
    CorrectionRequest, LlmDrafter, LlmRankCorrector, PlaceholderDrafter, RankCorrector,
    RuleBasedCorrector, SqlDrafter, PLACEHOLDER_SQL,
};
pub use factory::{create_client, create_collaborators, Collaborators};
pub use mock::{MockLlmClient, DEFAULT_MOCK_SQL};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use prompt::{build_user_prompt, sql_system_prompt};
pub use types::{Message, Role};

use async_trait::async_trait;
use std::str::FromStr;

use crate::error::{PilotError, Result};

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    ///
    /// Returns the complete response as a single string.
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// OpenAI chat completions.
    #[default]
    OpenAi,
    /// Mock client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = PilotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            _ => Err(PilotError::config(format!("Unknown LLM provider: {}", s))),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
