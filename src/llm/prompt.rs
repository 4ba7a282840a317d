//! Prompt construction for LLM requests.
//!
//! Builds the dialect-specific system prompt and the user prompt that
//! carries the retrieved context and the question.

use crate::db::Dialect;

/// Rules shared by every dialect.
const BASE_RULES: &str = "You are an expert data analyst who writes correct, safe, read-only SQL.
You must output ONLY SQL (no markdown, no explanations).
Do not use DML/DDL: INSERT, UPDATE, DELETE, MERGE, DROP, ALTER, TRUNCATE, CREATE.
Use only the tables/columns provided in the context.
If the question is ambiguous, choose the most reasonable interpretation using the provided schema.

Ranking rules (VERY IMPORTANT):
- If the user asks for a single rank like '2위', '3위', 'N위' or 'the 3rd highest':
  - This means the N-th rank ONLY (NOT 'top N').
  - Return ONLY rows whose rank is exactly N, including ties for that rank.
  - Use competition ranking (ties share the same rank and the next rank is skipped): use RANK().
  - Do NOT add tie-breaker columns inside the RANK() ORDER BY.
  - You may add ORDER BY for display AFTER filtering by rank.
- If the user asks for '상위 N개' / 'top N', return N rows.

Row limiting rules:
- Apply the row limiting clause exactly once.
- Never output both LIMIT and FETCH FIRST in the same SQL.
";

const ORACLE_RULES: &str = "Target database: Oracle.
Oracle rules:
- DO NOT use LIMIT.
- Use 'FETCH FIRST N ROWS ONLY' to limit rows.
- Prefer VARCHAR2 for string casting if needed.
";

const POSTGRES_RULES: &str = "Target database: PostgreSQL.
PostgreSQL rules:
- You may use LIMIT N to limit rows.
";

/// Builds the system prompt for the dialect.
pub fn sql_system_prompt(dialect: Dialect) -> String {
    let rules = match dialect {
        Dialect::Oracle => ORACLE_RULES,
        Dialect::Postgres => POSTGRES_RULES,
    };
    format!("{BASE_RULES}\n{rules}")
}

/// Builds the user prompt with context, question and output instructions.
pub fn build_user_prompt(question: &str, context: &str, row_limit: u32, dialect: Dialect) -> String {
    format!(
        "### Context\n{context}\n\n### Question\n{question}\n\n### Output\nWrite ONE SQL query. Use {}.\n",
        dialect.limit_clause(row_limit)
    )
}

/// Builds the user prompt for an exact-rank correction pass.
pub fn build_correction_prompt(question: &str, context: &str, sql: &str, dialect: Dialect) -> String {
    format!(
        "### Context\n{context}\n\n### Question\n{question}\n\n### Current SQL\n{sql}\n\n### Output\nRewrite the current SQL for {} so that it follows the rank rule. Output ONLY SQL.\n",
        match dialect {
            Dialect::Oracle => "Oracle",
            Dialect::Postgres => "PostgreSQL",
        }
    )
}
