//! Rank directive detection and the minimal rank correction.
//!
//! A question like "매출 2위 지점" or "the 3rd highest region" asks for rows
//! at exactly one rank, which LLM drafts tend to express with a ranking
//! function inside `HAVING`/`WHERE`. Oracle rejects that placement, so such
//! drafts are routed through a correction step before limit enforcement.
//! Top-N questions ("상위 5개", "top 5") are ranges, not directives.

use regex::Regex;
use std::sync::LazyLock;

use crate::db::Dialect;

use super::limit::{ensure_fetch_first, limit_to_fetch_first};

/// Ranking policy handed to the correction collaborator.
pub const RANK_POLICY: &str = "RANK RULE:\n\
- Compute the ranking in an inner stage (CTE: base -> ranked) and filter by the exact rank value in an outer stage (WHERE rnk = N).\n\
- NEVER place RANK(), DENSE_RANK() or ROW_NUMBER() in WHERE or HAVING.\n\
- Do NOT use SELECT *.\n\
- Do NOT duplicate aliases.\n\
- Output SQL only.\n";

static DIGIT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:위|등|번째)").expect("valid rank regex"));

static DIGIT_ORDINAL_EN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)(?:st|nd|rd|th)\b|\brank(?:ed)?\s*#?\s*(\d+)\b")
        .expect("valid rank regex")
});

static ORDINAL_WORD_KO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(첫|한|두|세|네|다섯|여섯|일곱|여덟|아홉|열)\s*번째").expect("valid rank regex")
});

static ORDINAL_WORD_EN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)[\s-]+(?:highest|largest|biggest|lowest|smallest|most|least|best|worst|place|ranked)\b",
    )
    .expect("valid rank regex")
});

static TOP_N: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(상위|\bTOP)\s*(\d+)").expect("valid top-n regex"));

/// An exact-rank request parsed from the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankDirective {
    /// 1-based rank the caller wants.
    pub ordinal: u32,
}

impl RankDirective {
    /// Extracts a directive from the question.
    ///
    /// Returns `None` when no ordinal is present, when it is zero, or when the
    /// question is phrased as a top-N range, even if an ordinal-looking token
    /// appears.
    pub fn from_question(question: &str) -> Option<Self> {
        if is_top_n_question(question) {
            return None;
        }
        extract_ordinal(question)
            .filter(|&n| n >= 1)
            .map(|ordinal| Self { ordinal })
    }
}

/// Returns true for "상위 N" / "TOP N" phrasings.
pub fn is_top_n_question(question: &str) -> bool {
    TOP_N.is_match(question)
}

/// Finds the first ordinal in the question, digits before words.
pub fn extract_ordinal(question: &str) -> Option<u32> {
    if let Some(caps) = DIGIT_SUFFIX.captures(question) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = DIGIT_ORDINAL_EN.captures(question) {
        return caps
            .get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse().ok());
    }
    if let Some(caps) = ORDINAL_WORD_KO.captures(question) {
        return caps.get(1).and_then(|m| korean_ordinal(m.as_str()));
    }
    if let Some(caps) = ORDINAL_WORD_EN.captures(question) {
        return caps.get(1).and_then(|m| english_ordinal(m.as_str()));
    }
    None
}

fn korean_ordinal(word: &str) -> Option<u32> {
    let n = match word {
        "첫" | "한" => 1,
        "두" => 2,
        "세" => 3,
        "네" => 4,
        "다섯" => 5,
        "여섯" => 6,
        "일곱" => 7,
        "여덟" => 8,
        "아홉" => 9,
        "열" => 10,
        _ => return None,
    };
    Some(n)
}

fn english_ordinal(word: &str) -> Option<u32> {
    let n = match word.to_ascii_lowercase().as_str() {
        "first" => 1,
        "second" => 2,
        "third" => 3,
        "fourth" => 4,
        "fifth" => 5,
        "sixth" => 6,
        "seventh" => 7,
        "eighth" => 8,
        "ninth" => 9,
        "tenth" => 10,
        _ => return None,
    };
    Some(n)
}

/// Mechanical correction applied to drafts answering a rank directive.
///
/// For Oracle every `LIMIT n` becomes `FETCH FIRST n ROWS ONLY`, and a
/// `FETCH FIRST <row_limit> ROWS ONLY` is appended when no clause exists.
/// Other dialects are returned unchanged. The result carries no terminator;
/// callers sanitize it again.
pub fn minimal_correction(sql: &str, dialect: Dialect, row_limit: u32) -> String {
    match dialect {
        Dialect::Oracle => {
            let s = limit_to_fetch_first(super::strip_terminator(sql));
            if row_limit == 0 {
                s
            } else {
                ensure_fetch_first(&s, row_limit)
            }
        }
        Dialect::Postgres => sql.to_string(),
    }
}
