//! Total-row count derivation.
//!
//! The count query wraps the finalized statement with its trailing
//! terminator, native limiting clause and top-level `ORDER BY` removed:
//! `SELECT COUNT(*) AS CNT FROM (<base>) t`.

use regex::Regex;
use std::sync::LazyLock;

use crate::db::Dialect;

/// How far past an `ORDER BY` to look for `OVER` before treating the match
/// as part of a window specification.
const OVER_LOOKAHEAD: usize = 30;

static TRAILING_FETCH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\bFETCH\s+(?:FIRST|NEXT)\s+\d+\s+ROWS?\s+ONLY\s*$")
        .expect("valid fetch regex")
});

static TRAILING_LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\bLIMIT\s+\d+(?:\s+OFFSET\s+\d+(?:\s+ROWS?)?)?\s*$")
        .expect("valid limit regex")
});

static WINDOW_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bOVER\s*\(").expect("valid window regex"));

/// Returns true when the statement uses any window/ranking function.
///
/// Total counting is skipped for such statements even when the window is
/// unrelated to the row count.
pub fn has_window_function(sql: &str) -> bool {
    WINDOW_FUNCTION.is_match(sql)
}

/// Builds the `SELECT COUNT(*)` statement for the given finalized SQL.
pub fn derive_count_query(sql: &str, dialect: Dialect) -> String {
    format!("SELECT COUNT(*) AS CNT FROM ({}) t", count_base(sql, dialect))
}

/// Returns the statement the count query wraps.
pub fn count_base(sql: &str, dialect: Dialect) -> String {
    let s = super::strip_terminator(sql);
    let s = strip_trailing_limit(s, dialect);
    strip_top_level_order_by(&s).to_string()
}

/// Removes a trailing row-limiting clause of the dialect's native kind.
pub fn strip_trailing_limit(sql: &str, dialect: Dialect) -> String {
    let re = match dialect {
        Dialect::Oracle => &*TRAILING_FETCH_FIRST,
        Dialect::Postgres => &*TRAILING_LIMIT,
    };
    re.replace(sql, "").trim_end().to_string()
}

/// Removes the final `ORDER BY` clause if it sits at parenthesis depth zero.
///
/// The string is scanned from the end. An `ORDER BY` inside parentheses is
/// never a candidate, and a depth-zero match followed closely by `OVER` is
/// skipped as part of a window specification.
pub fn strip_top_level_order_by(sql: &str) -> &str {
    let bytes = sql.as_bytes();
    let mut depth: usize = 0;

    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' => depth = depth.saturating_sub(1),
            _ => {}
        }

        if depth != 0 || order_by_at(bytes, i).is_none() {
            continue;
        }

        let lookahead = &bytes[i..(i + OVER_LOOKAHEAD).min(bytes.len())];
        if contains_ignore_ascii_case(lookahead, b"OVER") {
            continue;
        }

        // `ORDER` is ASCII, so `i` is a char boundary.
        return sql[..i].trim_end();
    }

    sql
}

/// Matches `ORDER <whitespace> BY` as whole words starting at `i`.
fn order_by_at(bytes: &[u8], i: usize) -> Option<usize> {
    if i > 0 && is_ident_byte(bytes[i - 1]) {
        return None;
    }

    let rest = &bytes[i..];
    if rest.len() < 5 || !rest[..5].eq_ignore_ascii_case(b"ORDER") {
        return None;
    }

    let mut pos = 5;
    let ws_start = pos;
    while pos < rest.len() && rest[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if pos == ws_start {
        return None;
    }

    if rest.len() < pos + 2 || !rest[pos..pos + 2].eq_ignore_ascii_case(b"BY") {
        return None;
    }
    pos += 2;

    if pos < rest.len() && is_ident_byte(rest[pos]) {
        return None;
    }

    Some(i + pos)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}
