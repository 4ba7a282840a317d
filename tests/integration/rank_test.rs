//! Exact-rank questions through the full pipeline.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sqlpilot::db::{Dialect, MockAdapter, StaticAdapterProvider};
use sqlpilot::llm::{LlmDrafter, LlmRankCorrector, MockLlmClient, Role};
use sqlpilot::pipeline::{Outcome, Pipeline, QueryRequest};
use sqlpilot::rag::EmptyRetriever;
use sqlpilot::sql::{RankDirective, RANK_POLICY};

use super::common::{both_dialects, mock_pipeline};

const HAVING_RANK_DRAFT: &str =
    "SELECT branch FROM sales GROUP BY branch HAVING RANK() OVER (ORDER BY SUM(amount) DESC) = 2";

#[test]
fn test_directive_extraction() {
    assert_eq!(
        RankDirective::from_question("지점별 매출 2위는?").map(|d| d.ordinal),
        Some(2)
    );
    assert_eq!(
        RankDirective::from_question("세번째로 많이 팔린 상품").map(|d| d.ordinal),
        Some(3)
    );
    assert_eq!(RankDirective::from_question("상위 5개 지점 중 2위"), None);
    assert_eq!(RankDirective::from_question("TOP 3 products"), None);
}

#[tokio::test]
async fn test_oracle_rank_question_gets_fetch_first() {
    let client = MockLlmClient::new().with_response("2위", HAVING_RANK_DRAFT);
    let (pg, ora) = both_dialects(Vec::new());
    let pipeline = mock_pipeline(&client, &[pg, ora]);

    let response = pipeline
        .handle(
            &QueryRequest::new("지점별 매출 2위")
                .with_dialect("oracle")
                .with_row_limit(100)
                .dry_run(true),
        )
        .await
        .unwrap();

    assert_eq!(
        response.sql,
        "SELECT BRANCH FROM SALES GROUP BY BRANCH HAVING RANK() OVER (ORDER BY SUM(AMOUNT) DESC) = 2\nFETCH FIRST 100 ROWS ONLY;"
    );
    assert_eq!(response.outcome, Outcome::DryRun);
}

#[tokio::test]
async fn test_oracle_rank_question_rewrites_limit() {
    let client = MockLlmClient::new().with_response("2nd", "SELECT a FROM t ORDER BY b DESC LIMIT 1");
    let (pg, ora) = both_dialects(Vec::new());
    let pipeline = mock_pipeline(&client, &[pg, ora]);

    let response = pipeline
        .handle(
            &QueryRequest::new("the 2nd biggest branch")
                .with_dialect("oracle")
                .dry_run(true),
        )
        .await
        .unwrap();

    assert_eq!(
        response.sql,
        "SELECT A FROM T ORDER BY B DESC FETCH FIRST 1 ROWS ONLY;"
    );
}

#[tokio::test]
async fn test_top_n_question_is_not_corrected() {
    let client = MockLlmClient::new().with_default("SELECT branch FROM sales ORDER BY amount DESC");
    let (pg, ora) = both_dialects(Vec::new());
    let pipeline = mock_pipeline(&client, &[pg, ora]);

    let response = pipeline
        .handle(
            &QueryRequest::new("상위 5개 지점 중 2위")
                .with_dialect("oracle")
                .dry_run(true),
        )
        .await
        .unwrap();

    // Oracle bounding happens at execution time.
    assert_eq!(response.sql, "SELECT BRANCH FROM SALES ORDER BY AMOUNT DESC;");
}

#[tokio::test]
async fn test_postgres_rank_question_passes_through() {
    let client = MockLlmClient::new().with_response("2위", HAVING_RANK_DRAFT);
    let (pg, ora) = both_dialects(Vec::new());
    let pipeline = mock_pipeline(&client, &[pg, ora]);

    let response = pipeline
        .handle(&QueryRequest::new("매출 2위").with_row_limit(10).dry_run(true))
        .await
        .unwrap();

    assert_eq!(
        response.sql,
        "SELECT BRANCH FROM SALES GROUP BY BRANCH HAVING RANK() OVER (ORDER BY SUM(AMOUNT) DESC) = 2\nLIMIT 10;"
    );
}

#[tokio::test]
async fn test_llm_rank_correction() {
    let drafter_client = MockLlmClient::new().with_default(HAVING_RANK_DRAFT);
    let fixer_client = MockLlmClient::new().with_default(
        "```sql\nWITH ranked AS (SELECT branch, SUM(amount) AS total, RANK() OVER (ORDER BY SUM(amount) DESC) AS rnk FROM sales GROUP BY branch) SELECT branch, total FROM ranked WHERE rnk = 2;\n```",
    );
    let ora = Arc::new(MockAdapter::new(Dialect::Oracle));

    let pipeline = Pipeline::new(
        Arc::new(LlmDrafter::new(Arc::new(drafter_client.clone()))),
        Arc::new(LlmRankCorrector::new(Arc::new(fixer_client.clone()))),
        Arc::new(EmptyRetriever),
        Arc::new(StaticAdapterProvider::new().with_adapter(ora.clone())),
    );

    let response = pipeline
        .handle(
            &QueryRequest::new("매출 2위 지점")
                .with_dialect("oracle")
                .with_row_limit(50),
        )
        .await
        .unwrap();

    assert_eq!(
        response.sql,
        "WITH RANKED AS (SELECT BRANCH, SUM(AMOUNT) AS TOTAL, RANK() OVER (ORDER BY SUM(AMOUNT) DESC) AS RNK FROM SALES GROUP BY BRANCH) SELECT BRANCH, TOTAL FROM RANKED WHERE RNK = 2\nFETCH FIRST 50 ROWS ONLY;"
    );
    assert_eq!(response.outcome, Outcome::Executed);
    assert_eq!(drafter_client.call_count(), 1);
    assert_eq!(fixer_client.call_count(), 1);

    let messages = fixer_client.last_messages();
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains(RANK_POLICY));
    assert!(messages[1].content.contains(HAVING_RANK_DRAFT));
}
