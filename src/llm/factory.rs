//! LLM collaborator factory.
//!
//! Centralizes the decision of which drafter and rank corrector to bind. A
//! missing API key binds the placeholder drafter instead of failing, so the
//! rest of the pipeline stays usable without credentials.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LlmConfig;
use crate::error::{PilotError, Result};
use crate::llm::{
    LlmClient, LlmDrafter, LlmProvider, LlmRankCorrector, MockLlmClient, OpenAiClient,
    OpenAiConfig, PlaceholderDrafter, RankCorrector, RuleBasedCorrector, SqlDrafter,
};

/// The collaborators the pipeline needs from the LLM layer.
#[derive(Clone)]
pub struct Collaborators {
    pub drafter: Arc<dyn SqlDrafter>,
    pub corrector: Arc<dyn RankCorrector>,
}

/// Creates an LLM client for the given provider.
///
/// Fails when the provider needs an API key and none is configured.
pub fn create_client(provider: LlmProvider, config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match provider {
        LlmProvider::OpenAi => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| PilotError::llm("No API key configured. Set OPENAI_API_KEY."))?;
            let openai = OpenAiConfig::new(key, config.model.clone()).with_timeout(config.timeout_secs);
            Ok(Arc::new(OpenAiClient::new(openai)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}

/// Binds the drafter and rank corrector from configuration.
///
/// `force_mock` selects the mock provider regardless of configuration.
pub fn create_collaborators(config: &LlmConfig, force_mock: bool) -> Result<Collaborators> {
    let provider = if force_mock {
        LlmProvider::Mock
    } else {
        config.provider.parse::<LlmProvider>()?
    };

    let client = match create_client(provider, config) {
        Ok(client) => client,
        Err(e) if provider == LlmProvider::OpenAi => {
            warn!("{e} Falling back to the placeholder drafter.");
            return Ok(Collaborators {
                drafter: Arc::new(PlaceholderDrafter),
                corrector: Arc::new(RuleBasedCorrector),
            });
        }
        Err(e) => return Err(e),
    };

    Ok(from_client(client, config.rank_rewrite, provider))
}

/// Binds collaborators around an existing client.
pub fn from_client(
    client: Arc<dyn LlmClient>,
    rank_rewrite: bool,
    provider: LlmProvider,
) -> Collaborators {
    let corrector: Arc<dyn RankCorrector> = if rank_rewrite {
        Arc::new(LlmRankCorrector::new(Arc::clone(&client)))
    } else {
        Arc::new(RuleBasedCorrector)
    };

    info!(provider = %provider, rank_rewrite, "LLM collaborators ready");
    Collaborators {
        drafter: Arc::new(LlmDrafter::new(client)),
        corrector,
    }
}
