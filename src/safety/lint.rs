//! Advisory parse lint.
//!
//! Runs the finalized statement through sqlparser and reports anything the
//! parser disagrees with. Notes never block execution; the textual validator
//! stays the only gate.

use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::{Dialect as ParserDialect, GenericDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use crate::db::Dialect;

/// Returns advisory notes for the statement; empty when the parser agrees.
pub fn lint(sql: &str, dialect: Dialect) -> Vec<String> {
    let parser_dialect: Box<dyn ParserDialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::Oracle => Box::new(GenericDialect {}),
    };

    let statements = match Parser::parse_sql(parser_dialect.as_ref(), sql) {
        Ok(statements) => statements,
        Err(e) => return vec![format!("SQL parser could not check this statement: {e}")],
    };

    let mut notes = Vec::new();

    if statements.len() > 1 {
        notes.push(format!("Parser found {} statements", statements.len()));
    }

    for statement in &statements {
        match statement {
            Statement::Query(query) => {
                if has_select_star(&query.body) {
                    notes.push("Query selects all columns with *".to_string());
                }
            }
            other => notes.push(format!("Parser classified statement as non-query: {}", kind(other))),
        }
    }

    notes
}

fn has_select_star(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select
            .projection
            .iter()
            .any(|item| matches!(item, sqlparser::ast::SelectItem::Wildcard(_))),
        SetExpr::Query(query) => has_select_star(&query.body),
        SetExpr::SetOperation { left, right, .. } => has_select_star(left) || has_select_star(right),
        _ => false,
    }
}

fn kind(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("UNKNOWN")
        .to_uppercase()
}
