//! Properties of the textual safety nets, checked through the public API.

use pretty_assertions::assert_eq;
use sqlpilot::db::Dialect;
use sqlpilot::safety::{validate, SecurityPolicy};
use sqlpilot::sql::{derive_count_query, enforce_limit, sanitize, uppercase_outside_literals};

#[test]
fn test_sanitize_is_idempotent() {
    let drafts = [
        "",
        "   ",
        "SELECT 1",
        "```sql\nSELECT a AS x AS x FROM t;;;\n```",
        "```\nselect * from t\n```",
        "SELECT a AS X AS x AS X FROM t ; ",
    ];

    for draft in drafts {
        let once = sanitize(draft);
        assert_eq!(sanitize(&once), once, "draft: {draft:?}");
        assert!(once.ends_with(';') && !once.ends_with(";;"));
    }
}

#[test]
fn test_repeated_aliases_collapse_once() {
    for repeats in 1..=5 {
        let aliases = vec!["AS X"; repeats].join(" ");
        let sql = sanitize(&format!("SELECT a {aliases} FROM t"));
        assert_eq!(sql, "SELECT a AS X FROM t;", "repeats: {repeats}");
    }
}

#[test]
fn test_non_select_statements_rejected() {
    let policy = SecurityPolicy::default();
    let statements = [
        "DELETE FROM t",
        "UPDATE t SET a = 1",
        "INSERT INTO t VALUES (1)",
        "MERGE INTO t USING s ON (1 = 1)",
        "EXPLAIN SELECT 1",
        "CALL proc()",
    ];

    for sql in statements {
        let verdict = validate(&uppercase_outside_literals(&sanitize(sql)), &policy);
        assert!(!verdict.ok, "{sql} should be rejected");
        assert!(verdict
            .warnings
            .contains(&"Only SELECT or WITH queries are allowed".to_string()));
    }
}

#[test]
fn test_blocked_keywords_in_comments_pass() {
    let policy = SecurityPolicy::default();
    for sql in [
        "SELECT A FROM T -- DROP TABLE T\n;",
        "SELECT A /* DELETE FROM T */ FROM T;",
        "SELECT A FROM T /* multi\nline TRUNCATE\n*/;",
    ] {
        let verdict = validate(sql, &policy);
        assert!(verdict.ok, "{sql}: {verdict}");
    }
}

#[test]
fn test_literal_comment_markers_do_not_hide_statements() {
    let policy = SecurityPolicy::default();
    for sql in [
        "SELECT 'x--' AS A LIMIT 1; DROP TABLE T; SELECT 1;",
        "SELECT 1 LIMIT 1 -- /*\n; DROP TABLE T; SELECT 1 /* */;",
    ] {
        let verdict = validate(sql, &policy);
        assert!(!verdict.ok, "{sql}");
    }
    assert!(validate("SELECT '--' AS A, '/*' AS B FROM T;", &policy).ok);
}

#[test]
fn test_allow_dml_narrows_blocklist() {
    let sql = "WITH X AS (SELECT 1 AS UPDATE_COUNT FROM DUAL) SELECT * FROM X;";
    assert!(validate(sql, &SecurityPolicy::new(false)).ok);

    let sql = "SELECT A FROM T WHERE NOTE = 'DELETE';";
    assert!(!validate(sql, &SecurityPolicy::new(false)).ok);
    assert!(validate(sql, &SecurityPolicy::new(true)).ok);
    assert!(!validate("SELECT 1; DROP TABLE T;", &SecurityPolicy::new(true)).ok);
}

#[test]
fn test_count_query_strips_fetch_and_order_by() {
    assert_eq!(
        derive_count_query(
            "SELECT a FROM t ORDER BY a FETCH FIRST 10 ROWS ONLY;",
            Dialect::Oracle
        ),
        "SELECT COUNT(*) AS CNT FROM (SELECT a FROM t) t"
    );
}

#[test]
fn test_count_query_keeps_window_order_by() {
    assert_eq!(
        derive_count_query("SELECT a, RANK() OVER (ORDER BY a) r FROM t", Dialect::Oracle),
        "SELECT COUNT(*) AS CNT FROM (SELECT a, RANK() OVER (ORDER BY a) r FROM t) t"
    );
}

#[test]
fn test_case_normalization_preserves_literals() {
    assert_eq!(
        uppercase_outside_literals("select 'Hello World' as greeting from dual"),
        "SELECT 'Hello World' AS GREETING FROM DUAL"
    );
    assert_eq!(
        uppercase_outside_literals("select name from branch where region = '서울 강남'"),
        "SELECT NAME FROM BRANCH WHERE REGION = '서울 강남'"
    );
}

#[test]
fn test_never_two_limit_kinds() {
    for dialect in [Dialect::Oracle, Dialect::Postgres] {
        for sql in [
            "SELECT a FROM t;",
            "SELECT a FROM t LIMIT 5;",
            "SELECT a FROM t FETCH FIRST 5 ROWS ONLY;",
        ] {
            let out = enforce_limit(sql, 20, dialect).to_uppercase();
            let has_limit = out.contains("LIMIT");
            let has_fetch = out.contains("FETCH FIRST");
            assert!(!(has_limit && has_fetch), "{dialect}: {out}");
        }
    }
}
