//! Draft sanitizer.
//!
//! Normalizes raw LLM output into a single statement with exactly one trailing
//! semicolon. Each step is idempotent, so sanitizing a sanitized string is a
//! no-op.

use regex::Regex;
use std::sync::LazyLock;

/// Upper bound on alias-collapsing passes.
const MAX_ALIAS_PASSES: usize = 5;

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*```(?:sql)?\s*").expect("valid fence regex"));

static FENCE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```\s*$").expect("valid fence regex"));

static ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bAS\s+([A-Z_][A-Z0-9_]*)\b").expect("valid alias regex")
});

static ALIAS_REPEAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s+AS\s+([A-Z_][A-Z0-9_]*)\b").expect("valid alias regex")
});

/// Sanitizes a raw SQL draft.
///
/// Strips markdown code fences, collapses `AS x AS x` alias duplication and
/// leaves exactly one trailing semicolon. Blank input yields `";"`.
pub fn sanitize(draft: &str) -> String {
    let unfenced = strip_fences(draft);
    let deduped = collapse_duplicate_aliases(&unfenced);
    normalize_terminator(&deduped)
}

/// Removes a leading and a trailing code fence (optionally tagged `sql`).
pub fn strip_fences(sql: &str) -> String {
    let s = sql.trim();
    let s = FENCE_OPEN.replace(s, "");
    let s = FENCE_CLOSE.replace(&s, "");
    s.trim().to_string()
}

/// Collapses `AS <ident> AS <ident> ...` into a single `AS <ident>`.
///
/// Identifiers are compared case-insensitively.
pub fn collapse_duplicate_aliases(sql: &str) -> String {
    let mut current = sql.to_string();
    for _ in 0..MAX_ALIAS_PASSES {
        let next = collapse_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn collapse_pass(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut copied_to = 0;
    let mut search_from = 0;

    while let Some(caps) = ALIAS.captures_at(sql, search_from) {
        let (Some(whole), Some(ident)) = (caps.get(0), caps.get(1)) else {
            break;
        };

        let mut end = whole.end();
        while let Some(rep) = ALIAS_REPEAT.captures(&sql[end..]) {
            match (rep.get(0), rep.get(1)) {
                (Some(rep_whole), Some(rep_ident))
                    if rep_ident.as_str().eq_ignore_ascii_case(ident.as_str()) =>
                {
                    end += rep_whole.end();
                }
                _ => break,
            }
        }

        if end > whole.end() {
            out.push_str(&sql[copied_to..whole.start()]);
            out.push_str("AS ");
            out.push_str(ident.as_str());
            copied_to = end;
            search_from = end;
        } else {
            search_from = whole.end();
        }
    }

    out.push_str(&sql[copied_to..]);
    out
}

/// Strips every trailing semicolon and whitespace, then appends one `;`.
pub fn normalize_terminator(sql: &str) -> String {
    let mut s = super::strip_terminator(sql).to_string();
    s.push(';');
    s
}
