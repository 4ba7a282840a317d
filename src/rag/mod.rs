//! Context retrieval for prompt assembly.
//!
//! Retrievers return ranked [`SourceChunk`]s for a question, optionally
//! restricted to a namespace (`schema`, `examples`). Similarity search
//! backends live outside this crate; the in-memory retriever covers local
//! use and tests.

pub mod context;

pub use context::{build_context, EXAMPLES_NAMESPACE, SCHEMA_NAMESPACE};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PilotError, Result};

/// A piece of retrieved context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceChunk {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Relevance, higher is better. `None` when the backend gives no score.
    #[serde(default)]
    pub score: Option<f64>,
}

impl SourceChunk {
    /// Creates an unscored chunk with empty metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: serde_json::Map::new(),
            score: None,
        }
    }

    /// Tags the chunk with a namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metadata
            .insert("namespace".to_string(), serde_json::Value::String(namespace.into()));
        self
    }

    /// Returns the chunk's namespace, if tagged.
    pub fn namespace(&self) -> Option<&str> {
        self.metadata.get("namespace").and_then(|v| v.as_str())
    }
}

/// Returns ranked context chunks for a query.
///
/// Implementations must tolerate empty results.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<SourceChunk>>;
}

/// Retriever that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRetriever;

#[async_trait]
impl ContextRetriever for EmptyRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _top_k: usize,
        _namespace: Option<&str>,
    ) -> Result<Vec<SourceChunk>> {
        Ok(Vec::new())
    }
}

/// Scores chunks held in memory by query-term overlap.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRetriever {
    chunks: Vec<SourceChunk>,
}

impl InMemoryRetriever {
    pub fn new(chunks: Vec<SourceChunk>) -> Self {
        Self { chunks }
    }

    /// Loads chunks from a JSON array of `{id, text, metadata}` objects.
    ///
    /// Chunks without an id get `<namespace>_<index>`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PilotError::retrieval(format!(
                "Failed to read chunks file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut chunks: Vec<SourceChunk> = serde_json::from_str(&content).map_err(|e| {
            PilotError::retrieval(format!(
                "Failed to parse chunks file {}: {}",
                path.display(),
                e
            ))
        })?;

        for (i, chunk) in chunks.iter_mut().enumerate() {
            if chunk.id.trim().is_empty() {
                chunk.id = format!("{}_{}", chunk.namespace().unwrap_or("chunk"), i);
            }
        }

        info!(count = chunks.len(), path = %path.display(), "Loaded context chunks");
        Ok(Self::new(chunks))
    }

    /// Returns the number of held chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Splits text into lowercase terms on anything that is not alphanumeric.
fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of query terms found in the chunk text.
fn overlap_score(query_terms: &[String], text: &str) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let haystack = text.to_lowercase();
    let hits = query_terms
        .iter()
        .filter(|t| haystack.contains(t.as_str()))
        .count();
    hits as f64 / query_terms.len() as f64
}

#[async_trait]
impl ContextRetriever for InMemoryRetriever {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<SourceChunk>> {
        let query_terms = terms(query);

        let mut scored: Vec<SourceChunk> = self
            .chunks
            .iter()
            .filter(|c| namespace.is_none() || c.namespace() == namespace)
            .map(|c| {
                let mut chunk = c.clone();
                chunk.score = Some(overlap_score(&query_terms, &c.text));
                chunk
            })
            .collect();

        // Stable sort keeps file order among equal scores.
        scored.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .total_cmp(&a.score.unwrap_or(0.0))
        });
        scored.truncate(top_k);

        debug!(
            namespace = namespace.unwrap_or("*"),
            top_k,
            found = scored.len(),
            "Retrieved chunks"
        );
        Ok(scored)
    }
}
