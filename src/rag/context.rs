//! Assembles the context text handed to the drafter.

use super::{ContextRetriever, SourceChunk};
use crate::error::Result;

pub const SCHEMA_NAMESPACE: &str = "schema";
pub const EXAMPLES_NAMESPACE: &str = "examples";

/// Appended to every context, whatever was retrieved.
const RANKING_RULES: &str = "[CRITICAL SQL RULES - MUST FOLLOW]

1. NEVER put window functions such as RANK(), DENSE_RANK() or ROW_NUMBER()
   directly in a WHERE or HAVING clause.

2. A question about one specific rank (e.g. \"2위\", \"두번째\", \"rank 3\")
   MUST be answered with a subquery or CTE.

3. Required shape:

WITH ranked AS (
    SELECT
        <group columns>,
        <aggregate> AS total_metric,
        RANK() OVER (ORDER BY <aggregate> DESC) AS rnk
    FROM <table>
    WHERE <conditions>
    GROUP BY <group columns>
)
SELECT <group columns>, total_metric
FROM ranked
WHERE rnk = <N>;

4. Forbidden shape:

SELECT ...
FROM ...
GROUP BY ...
HAVING RANK() OVER (...) = N;

Queries in the forbidden shape fail at execution time.";

/// Retrieves schema and example chunks and formats them for the prompt.
///
/// Schema gets `top_k` chunks, examples get `max(2, top_k / 2)`. Returns the
/// context text and every chunk used, schema first.
pub async fn build_context(
    retriever: &dyn ContextRetriever,
    question: &str,
    top_k: usize,
) -> Result<(String, Vec<SourceChunk>)> {
    let schema = retriever
        .retrieve(question, top_k, Some(SCHEMA_NAMESPACE))
        .await?;
    let examples = retriever
        .retrieve(question, (top_k / 2).max(2), Some(EXAMPLES_NAMESPACE))
        .await?;

    let context = [
        format_chunks("Relevant schema", &schema),
        format_chunks("Relevant examples", &examples),
        RANKING_RULES.to_string(),
    ]
    .join("\n")
    .trim()
    .to_string();

    let mut sources = schema;
    sources.extend(examples);
    Ok((context, sources))
}

fn format_chunks(title: &str, chunks: &[SourceChunk]) -> String {
    if chunks.is_empty() {
        return format!("{title}: (none)\n");
    }
    let lines = chunks
        .iter()
        .map(|c| format!("- {}\n", c.text.trim()))
        .collect::<String>();
    format!("{title}:\n{lines}")
}
