//! Text-level SQL transformations.
//!
//! Every stage here is a pure string-to-string function. None of them parse
//! SQL; they apply narrow, auditable edits to the draft produced by the LLM
//! so that it reaches the validator in a canonical shape:
//!
//! draft → [`sanitize`] → [`rank`] → [`limit`] → [`normalize`] → validator
//!
//! [`count`] holds the helpers the execution adapters use to derive the
//! total-row query.

pub mod count;
pub mod limit;
pub mod normalize;
pub mod rank;
pub mod sanitize;

pub use count::{count_base, derive_count_query, has_window_function};
pub use limit::{enforce_limit, ensure_fetch_first, has_row_limit, limit_to_fetch_first};
pub use normalize::uppercase_outside_literals;
pub use rank::{RankDirective, RANK_POLICY};
pub use sanitize::sanitize;

/// Strips trailing statement terminators and surrounding whitespace.
///
/// Some drivers reject a trailing `;`, and drafts sometimes carry several.
pub fn strip_terminator(sql: &str) -> &str {
    sql.trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_terminator_single() {
        assert_eq!(strip_terminator("SELECT 1;"), "SELECT 1");
    }

    #[test]
    fn test_strip_terminator_repeated_with_spaces() {
        assert_eq!(strip_terminator("  SELECT 1 ; ;\n"), "SELECT 1");
    }

    #[test]
    fn test_strip_terminator_keeps_inner_semicolons() {
        assert_eq!(strip_terminator("SELECT ';' FROM t;"), "SELECT ';' FROM t");
    }

    #[test]
    fn test_strip_terminator_empty() {
        assert_eq!(strip_terminator(" ; "), "");
    }
}
