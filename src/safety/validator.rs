//! Textual statement validator.

use regex::RegexBuilder;
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer, TokenizerError, Whitespace};

use super::{SecurityPolicy, ValidationVerdict};

/// Tokenizes the statement and blanks out every comment.
///
/// Literals, quoted identifiers and both comment kinds are read in one
/// left-to-right pass, so `--` or `/*` inside a literal stays literal text and
/// whichever comment opens first decides where it ends.
fn code_tokens(sql: &str) -> Result<Vec<Token>, TokenizerError> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, sql).tokenize()?;

    Ok(tokens
        .into_iter()
        .map(|token| match token {
            Token::Whitespace(Whitespace::SingleLineComment { .. })
            | Token::Whitespace(Whitespace::MultiLineComment(_)) => {
                Token::Whitespace(Whitespace::Space)
            }
            other => other,
        })
        .collect())
}

fn render(tokens: &[Token]) -> String {
    tokens.iter().map(ToString::to_string).collect()
}

/// Removes `--` line comments and `/* ... */` block comments, leaving
/// literals untouched.
///
/// Returns `None` when a literal or block comment is never closed.
pub fn strip_comments(sql: &str) -> Option<String> {
    code_tokens(sql).ok().map(|tokens| render(&tokens))
}

/// Validates a finalized statement against the policy.
///
/// Every check runs and every failure is reported, so the caller sees all
/// reasons at once.
pub fn validate(sql: &str, policy: &SecurityPolicy) -> ValidationVerdict {
    if sql.trim().is_empty() {
        return ValidationVerdict::reject(vec!["Empty SQL".to_string()]);
    }

    let tokens = match code_tokens(sql) {
        Ok(tokens) => tokens,
        Err(e) => return ValidationVerdict::reject(vec![format!("Unreadable SQL: {e}")]),
    };
    let code: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect();
    let stripped = render(&tokens);
    let text = stripped.trim();
    let mut warnings = Vec::new();

    let leads_with_query = matches!(
        code.first(),
        Some(Token::Word(w)) if w.quote_style.is_none()
            && (w.value.eq_ignore_ascii_case("SELECT") || w.value.eq_ignore_ascii_case("WITH"))
    );
    if !leads_with_query {
        warnings.push("Only SELECT or WITH queries are allowed".to_string());
    }

    for keyword in policy.blocked_keywords() {
        if contains_word(text, keyword) {
            warnings.push(format!("Blocked keyword: {keyword}"));
        }
    }

    // One terminator is allowed, and only as the last token.
    let body = match code.split_last() {
        Some((Token::SemiColon, rest)) => rest,
        _ => &code[..],
    };
    if body.iter().any(|t| matches!(t, Token::SemiColon)) {
        warnings.push("Multiple statements are not allowed".to_string());
    }

    if warnings.is_empty() {
        ValidationVerdict::pass()
    } else {
        ValidationVerdict::reject(warnings)
    }
}

fn contains_word(text: &str, keyword: &str) -> bool {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(keyword)))
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}
