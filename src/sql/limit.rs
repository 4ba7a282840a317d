//! Row-limit enforcement.
//!
//! Guarantees that a statement carries at most one kind of row-limiting
//! clause, in the syntax of the target dialect.

use regex::Regex;
use std::sync::LazyLock;

use crate::db::Dialect;

static LIMIT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\b").expect("valid limit regex"));

static LIMIT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)\b").expect("valid limit regex"));

static FETCH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bFETCH\s+(?:FIRST|NEXT)\s+\d+\s+ROWS?\s+ONLY\b").expect("valid fetch regex")
});

/// Returns true if the statement already carries a row-limiting clause the
/// dialect understands.
pub fn has_row_limit(sql: &str, dialect: Dialect) -> bool {
    match dialect {
        Dialect::Oracle => FETCH_FIRST.is_match(sql),
        Dialect::Postgres => LIMIT_TOKEN.is_match(sql) || FETCH_FIRST.is_match(sql),
    }
}

/// Rewrites every `LIMIT n` into `FETCH FIRST n ROWS ONLY`.
pub fn limit_to_fetch_first(sql: &str) -> String {
    LIMIT_CLAUSE
        .replace_all(sql, "FETCH FIRST ${1} ROWS ONLY")
        .into_owned()
}

/// Appends `FETCH FIRST n ROWS ONLY` on a new line unless one is present.
///
/// The input must not carry a trailing terminator.
pub fn ensure_fetch_first(sql: &str, row_limit: u32) -> String {
    if FETCH_FIRST.is_match(sql) {
        sql.to_string()
    } else {
        format!("{sql}\nFETCH FIRST {row_limit} ROWS ONLY")
    }
}

/// Ensures exactly one dialect-appropriate limiting clause.
///
/// - Oracle: an existing `FETCH FIRST` is kept; a stray `LIMIT n` is rewritten
///   to `FETCH FIRST n ROWS ONLY`; otherwise nothing is appended here because
///   the Oracle adapter appends the clause at execution time.
/// - Postgres: `LIMIT <row_limit>` is appended before the terminator unless a
///   `LIMIT` (or `FETCH FIRST`) is already present.
///
/// The result always ends with a single `;`.
pub fn enforce_limit(sql: &str, row_limit: u32, dialect: Dialect) -> String {
    let s = super::strip_terminator(sql);
    match dialect {
        Dialect::Oracle => {
            if !FETCH_FIRST.is_match(s) && LIMIT_CLAUSE.is_match(s) {
                format!("{};", limit_to_fetch_first(s))
            } else {
                format!("{s};")
            }
        }
        Dialect::Postgres => {
            if has_row_limit(s, dialect) {
                format!("{s};")
            } else {
                format!("{s}\nLIMIT {row_limit};")
            }
        }
    }
}
