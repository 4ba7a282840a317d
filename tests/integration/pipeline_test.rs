//! End-to-end pipeline tests with mock collaborators.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sqlpilot::db::{Dialect, MockAdapter, MockCall};
use sqlpilot::error::PilotError;
use sqlpilot::llm::MockLlmClient;
use sqlpilot::pipeline::{Outcome, QueryRequest};
use sqlpilot::rag::{InMemoryRetriever, SourceChunk};

use super::common::{both_dialects, mock_pipeline, rows, with_retriever};

#[tokio::test]
async fn test_dry_run_never_touches_adapter() {
    let client = MockLlmClient::new().with_default("select a from t where b = 'Hello World'");
    let (pg, ora) = both_dialects(rows(3));
    let pipeline = mock_pipeline(&client, &[pg.clone(), ora.clone()]);

    let response = pipeline
        .handle(
            &QueryRequest::new("all a")
                .dry_run(true)
                .include_sources(true)
                .with_row_limit(10),
        )
        .await
        .unwrap();

    assert_eq!(response.outcome, Outcome::DryRun);
    assert_eq!(response.summary, "Dry run");
    assert_eq!(response.sql, "SELECT A FROM T WHERE B = 'Hello World'\nLIMIT 10;");
    assert!(response.results.is_empty());
    assert!(response.sources.is_none());
    assert!(pg.calls().is_empty());
    assert!(ora.calls().is_empty());
}

#[tokio::test]
async fn test_drop_table_rejected_everywhere() {
    for draft in ["DROP TABLE x", "SELECT a FROM t; DROP TABLE x"] {
        for dialect in ["postgres", "oracle"] {
            for row_limit in [1, 10, 200] {
                let client = MockLlmClient::new().with_default(draft);
                let (pg, ora) = both_dialects(rows(3));
                let pipeline = mock_pipeline(&client, &[pg.clone(), ora.clone()]);

                let response = pipeline
                    .handle(
                        &QueryRequest::new("remove x")
                            .with_dialect(dialect)
                            .with_row_limit(row_limit),
                    )
                    .await
                    .unwrap();

                assert_eq!(response.outcome, Outcome::Rejected, "{draft} / {dialect}");
                assert!(response.summary.starts_with("SQL rejected: "));
                assert!(response
                    .warnings
                    .contains(&"Blocked keyword: DROP".to_string()));
                assert!(response.results.is_empty());
                assert!(response.sql.contains("DROP TABLE X"));
                assert!(pg.calls().is_empty() && ora.calls().is_empty());
            }
        }
    }
}

#[tokio::test]
async fn test_rejected_delete_reports_every_reason() {
    let client = MockLlmClient::new().with_default("DELETE FROM t");
    let (pg, ora) = both_dialects(Vec::new());
    let pipeline = mock_pipeline(&client, &[pg, ora]);

    let response = pipeline.handle(&QueryRequest::new("q")).await.unwrap();

    assert_eq!(
        response.warnings,
        vec![
            "Only SELECT or WITH queries are allowed".to_string(),
            "Blocked keyword: DELETE".to_string(),
        ]
    );
    assert_eq!(
        response.summary,
        "SQL rejected: Only SELECT or WITH queries are allowed; Blocked keyword: DELETE"
    );
}

#[tokio::test]
async fn test_blocked_keyword_in_comment_is_ignored() {
    let client = MockLlmClient::new().with_default("SELECT a FROM t -- DROP TABLE t");
    let (pg, ora) = both_dialects(rows(1));
    let pipeline = mock_pipeline(&client, &[pg.clone(), ora]);

    let response = pipeline.handle(&QueryRequest::new("q")).await.unwrap();

    assert_eq!(response.outcome, Outcome::Executed);
    assert_eq!(pg.execute_calls(), 1);
}

#[tokio::test]
async fn test_comment_markers_cannot_hide_second_statement() {
    let drafts = [
        "SELECT 'x--' AS a LIMIT 1; COMMIT; DROP TABLE t; SELECT 1",
        "SELECT 1 LIMIT 1 -- /*\n; DROP TABLE t; SELECT 1 /* */",
    ];

    for draft in drafts {
        let client = MockLlmClient::new().with_default(draft);
        let (pg, ora) = both_dialects(rows(1));
        let pipeline = mock_pipeline(&client, &[pg.clone(), ora]);

        let response = pipeline.handle(&QueryRequest::new("q")).await.unwrap();

        assert_eq!(response.outcome, Outcome::Rejected, "{draft}");
        assert!(response
            .warnings
            .contains(&"Multiple statements are not allowed".to_string()));
        assert!(response
            .warnings
            .contains(&"Blocked keyword: DROP".to_string()));
        assert!(pg.calls().is_empty());
    }
}

#[tokio::test]
async fn test_total_count_with_truncation() {
    let client = MockLlmClient::new().with_default("SELECT a FROM t ORDER BY a");
    let pg = Arc::new(MockAdapter::new(Dialect::Postgres).with_rows(rows(5)).with_total(42));
    let pipeline = mock_pipeline(&client, &[pg.clone()]);

    let response = pipeline
        .handle(&QueryRequest::new("q").with_row_limit(3).include_total(true))
        .await
        .unwrap();

    assert_eq!(response.outcome, Outcome::Executed);
    assert_eq!(response.results.len(), 3);
    assert_eq!(response.total_rows, Some(42));
    assert!(response.is_limited);
    assert_eq!(response.summary, "Showing 3 of 42 rows (limited)");
    assert_eq!(
        pg.calls(),
        vec![
            MockCall::Count {
                sql: "SELECT COUNT(*) AS CNT FROM (SELECT A FROM T) t".to_string(),
            },
            MockCall::Execute {
                sql: "SELECT A FROM T ORDER BY A\nLIMIT 3;".to_string(),
                row_limit: 3,
            },
        ]
    );
}

#[tokio::test]
async fn test_total_count_complete() {
    let client = MockLlmClient::new().with_default("SELECT a FROM t");
    let pg = Arc::new(MockAdapter::new(Dialect::Postgres).with_rows(rows(2)));
    let pipeline = mock_pipeline(&client, &[pg]);

    let response = pipeline
        .handle(&QueryRequest::new("q").with_row_limit(10).include_total(true))
        .await
        .unwrap();

    assert_eq!(response.total_rows, Some(2));
    assert!(!response.is_limited);
    assert_eq!(response.summary, "2 rows in total");
}

#[tokio::test]
async fn test_window_function_skips_count() {
    let client = MockLlmClient::new()
        .with_default("SELECT a, RANK() OVER (ORDER BY a) r FROM t");
    let pg = Arc::new(MockAdapter::new(Dialect::Postgres).with_rows(rows(2)));
    let pipeline = mock_pipeline(&client, &[pg.clone()]);

    let response = pipeline
        .handle(&QueryRequest::new("q").include_total(true))
        .await
        .unwrap();

    assert_eq!(response.total_rows, None);
    assert_eq!(response.summary, "Showing 2 rows");
    assert_eq!(pg.count_calls(), 0);
    assert_eq!(pg.execute_calls(), 1);
}

#[tokio::test]
async fn test_backend_failure_becomes_response() {
    let client = MockLlmClient::new().with_default("SELECT a FROM t");
    let pg = Arc::new(MockAdapter::new(Dialect::Postgres).failing("relation \"t\" does not exist"));
    let pipeline = mock_pipeline(&client, &[pg]);

    let response = pipeline
        .handle(&QueryRequest::new("q").include_total(true))
        .await
        .unwrap();

    assert_eq!(response.outcome, Outcome::Failed);
    assert!(response.results.is_empty());
    assert_eq!(
        response.summary,
        "Execution failed: Execution error: relation \"t\" does not exist"
    );
}

#[tokio::test]
async fn test_unsupported_dialect_is_raised_before_drafting() {
    let client = MockLlmClient::new();
    let (pg, ora) = both_dialects(Vec::new());
    let pipeline = mock_pipeline(&client, &[pg, ora]);

    let err = pipeline
        .handle(&QueryRequest::new("q").with_dialect("mysql"))
        .await
        .unwrap_err();

    assert!(matches!(err, PilotError::UnsupportedDialect(_)));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_oracle_limit_rewritten_to_fetch_first() {
    let client = MockLlmClient::new().with_default("SELECT a FROM t ORDER BY a LIMIT 5;");
    let (pg, ora) = both_dialects(rows(2));
    let pipeline = mock_pipeline(&client, &[pg, ora.clone()]);

    let response = pipeline
        .handle(&QueryRequest::new("q").with_dialect("ORACLE").include_total(true))
        .await
        .unwrap();

    assert_eq!(response.sql, "SELECT A FROM T ORDER BY A FETCH FIRST 5 ROWS ONLY;");
    assert_eq!(
        ora.calls()[0],
        MockCall::Count {
            sql: "SELECT COUNT(*) AS CNT FROM (SELECT A FROM T) t".to_string(),
        }
    );
}

#[tokio::test]
async fn test_fenced_draft_with_duplicate_aliases() {
    let client = MockLlmClient::new()
        .with_default("```sql\nSELECT name AS n AS n AS n FROM branch;;\n```");
    let (pg, ora) = both_dialects(Vec::new());
    let pipeline = mock_pipeline(&client, &[pg, ora]);

    let response = pipeline
        .handle(&QueryRequest::new("q").dry_run(true).with_row_limit(7))
        .await
        .unwrap();

    assert_eq!(response.sql, "SELECT NAME AS N FROM BRANCH\nLIMIT 7;");
}

#[tokio::test]
async fn test_sources_and_context_reach_the_drafter() {
    let client = MockLlmClient::new().with_default("SELECT branch FROM sales");
    let retriever = InMemoryRetriever::new(vec![
        SourceChunk::new("s1", "Table SALES(BRANCH, AMOUNT)").in_namespace("schema"),
        SourceChunk::new("e1", "Q: sales per branch").in_namespace("examples"),
    ]);
    let (pg, ora) = both_dialects(rows(1));
    let pipeline = with_retriever(&client, &[pg, ora], Arc::new(retriever));

    let response = pipeline
        .handle(&QueryRequest::new("sales per branch").include_sources(true))
        .await
        .unwrap();

    let ids: Vec<_> = response
        .sources
        .as_ref()
        .unwrap()
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(ids, vec!["s1", "e1"]);

    let messages = client.last_messages();
    assert!(messages[1].content.contains("- Table SALES(BRANCH, AMOUNT)"));
    assert!(messages[1].content.contains("Use LIMIT 200."));
}

#[tokio::test]
async fn test_response_json_shape() {
    let client = MockLlmClient::new().with_default("SELECT a FROM t");
    let (pg, ora) = both_dialects(rows(1));
    let pipeline = mock_pipeline(&client, &[pg, ora]);

    let response = pipeline.handle(&QueryRequest::new("q")).await.unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["outcome"], "executed");
    assert_eq!(json["results"][0]["A"], 1);
    assert!(json["total_rows"].is_null());
    assert!(json.get("sources").is_none());
}
