//! Query safety gate.
//!
//! The textual [`validate`] check is the only gate in front of execution:
//! comments are stripped, the statement must be a single `SELECT`/`WITH`,
//! and no blocked keyword may appear as a whole word. A failed verdict is a
//! normal outcome, not an error. [`lint`] adds non-blocking parser notes.

mod lint;
mod validator;

pub use lint::lint;
pub use validator::{strip_comments, validate};

use std::fmt;

/// Keywords blocked by default.
pub const DEFAULT_BLOCKED_KEYWORDS: &[&str] = &[
    "DROP", "TRUNCATE", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "REPLACE", "GRANT",
    "REVOKE",
];

/// Keywords still blocked when DML is allowed.
pub const DDL_BLOCKED_KEYWORDS: &[&str] =
    &["DROP", "TRUNCATE", "ALTER", "CREATE", "GRANT", "REVOKE"];

/// The blocklist applied by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    blocked_keywords: Vec<String>,
}

impl SecurityPolicy {
    /// Builds the policy from the DML-allowance flag.
    pub fn new(allow_dml: bool) -> Self {
        let keywords = if allow_dml {
            DDL_BLOCKED_KEYWORDS
        } else {
            DEFAULT_BLOCKED_KEYWORDS
        };
        Self::with_keywords(keywords.iter().copied())
    }

    /// Builds a policy with a custom blocklist.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocked_keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_uppercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Returns the blocked keywords, upper-cased.
    pub fn blocked_keywords(&self) -> &[String] {
        &self.blocked_keywords
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Outcome of validating one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationVerdict {
    /// True when the statement may be executed.
    pub ok: bool,
    /// Blocking reasons, in the order the checks ran.
    pub warnings: Vec<String>,
}

impl ValidationVerdict {
    /// A passing verdict.
    pub fn pass() -> Self {
        Self {
            ok: true,
            warnings: Vec::new(),
        }
    }

    /// A failing verdict with the given reasons.
    pub fn reject(warnings: Vec<String>) -> Self {
        Self { ok: false, warnings }
    }

    /// Joins the reasons for display.
    pub fn reasons(&self) -> String {
        self.warnings.join("; ")
    }
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ok {
            write!(f, "OK")
        } else {
            write!(f, "Rejected: {}", self.reasons())
        }
    }
}
