//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{PilotError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Answer returned when no pattern matches.
pub const DEFAULT_MOCK_SQL: &str = "SELECT 1 AS example;";

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Patterns are matched, case-insensitively, against the question of the
/// last user message (the `### Question` section when present, otherwise
/// the whole message). Clones share the call log.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    default_response: Option<String>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
    last_messages: Arc<Mutex<Vec<Message>>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the question contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Replaces the fallback answer.
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Makes every call fail with an LLM error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Returns how many completions were requested.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the messages of the most recent call.
    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        self.default_response
            .clone()
            .unwrap_or_else(|| DEFAULT_MOCK_SQL.to_string())
    }
}

/// Returns the `### Question` section of a prompt, or the whole prompt.
fn question_section(content: &str) -> &str {
    let Some(start) = content.find("### Question") else {
        return content;
    };
    let rest = &content[start + "### Question".len()..];
    let end = rest.find("\n### ").unwrap_or(rest.len());
    rest[..end].trim()
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }

        if let Some(message) = &self.failure {
            return Err(PilotError::llm(message.clone()));
        }

        let input = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| question_section(&m.content))
            .unwrap_or("");

        Ok(self.mock_response(input))
    }
}
