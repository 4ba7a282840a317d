//! Case normalization.
//!
//! Upper-cases everything outside single-quoted literals so the validator's
//! keyword matching sees canonical text, while literal values such as Korean
//! labels or mixed-case codes are copied byte for byte.

/// Upper-cases all text outside single-quoted string literals.
///
/// The in-literal flag toggles on every `'`. A doubled `''` escape toggles
/// twice and therefore stays inside the literal.
pub fn uppercase_outside_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;

    for ch in sql.chars() {
        if ch == '\'' {
            in_literal = !in_literal;
            out.push(ch);
        } else if in_literal {
            out.push(ch);
        } else {
            out.extend(ch.to_uppercase());
        }
    }

    out
}
