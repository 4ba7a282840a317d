//! Human-readable result summaries.

/// Builds the summary line and the truncation flag for an executed query.
///
/// With a known total the query counts as limited only when the page is full
/// and the total exceeds the limit. Without a total, a full page is assumed to
/// be truncated.
pub fn build_summary(returned: usize, total: Option<u64>, row_limit: u32) -> (String, bool) {
    let page_full = returned as u64 >= u64::from(row_limit);

    match total {
        Some(total) => {
            let limited = page_full && total > u64::from(row_limit);
            let text = if limited {
                format!("Showing {returned} of {total} rows (limited)")
            } else {
                format!("{total} rows in total")
            };
            (text, limited)
        }
        None if page_full => (format!("Showing {returned} rows (limited)"), true),
        None => (format!("Showing {returned} rows"), false),
    }
}

pub fn rejected_summary(reasons: &str) -> String {
    format!("SQL rejected: {reasons}")
}

pub const DRY_RUN_SUMMARY: &str = "Dry run";

pub fn failure_summary(error: &impl std::fmt::Display) -> String {
    format!("Execution failed: {error}")
}
