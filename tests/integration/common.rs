//! Shared helpers for pipeline tests.

use std::sync::Arc;

use sqlpilot::db::{Dialect, MockAdapter, Row, StaticAdapterProvider};
use sqlpilot::llm::{LlmDrafter, MockLlmClient, RuleBasedCorrector};
use sqlpilot::pipeline::Pipeline;
use sqlpilot::rag::{ContextRetriever, EmptyRetriever};

/// Builds a pipeline around a mock LLM and mock adapters.
pub fn mock_pipeline(client: &MockLlmClient, adapters: &[Arc<MockAdapter>]) -> Pipeline {
    with_retriever(client, adapters, Arc::new(EmptyRetriever))
}

pub fn with_retriever(
    client: &MockLlmClient,
    adapters: &[Arc<MockAdapter>],
    retriever: Arc<dyn ContextRetriever>,
) -> Pipeline {
    let provider = adapters
        .iter()
        .fold(StaticAdapterProvider::new(), |p, a| p.with_adapter(a.clone()));

    Pipeline::new(
        Arc::new(LlmDrafter::new(Arc::new(client.clone()))),
        Arc::new(RuleBasedCorrector),
        retriever,
        Arc::new(provider),
    )
}

/// A mock adapter for each dialect, both returning `rows`.
pub fn both_dialects(rows: Vec<Row>) -> (Arc<MockAdapter>, Arc<MockAdapter>) {
    (
        Arc::new(MockAdapter::new(Dialect::Postgres).with_rows(rows.clone())),
        Arc::new(MockAdapter::new(Dialect::Oracle).with_rows(rows)),
    )
}

/// `n` single-column rows.
pub fn rows(n: i64) -> Vec<Row> {
    (1..=n).map(|i| Row::new().with("A", i)).collect()
}
