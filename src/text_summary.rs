//! Text summary builder for CLI output.
//!
//! This module formats a run report into human-readable lines for text mode.

use crate::orchestrator::RunReport;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a finished workflow report.
pub(crate) fn build_text_summary(report: &RunReport) -> TextSummary {
    let mut lines = Vec::new();
    let q = &report.query;
    lines.push(format!(
        "Planning {} / branch {} / rounds {}-{}",
        q.planning_date, q.branch, q.start_round, q.end_round
    ));

    match report.pending_plans {
        Some(n) => lines.push(format!("Pending plans: {n}")),
        None => lines.push("Pending plans: -".into()),
    }

    if report.outcome.is_some() {
        let c = &report.live_counters;
        lines.push(format!(
            "Rounds: {} planned, {} orders created, {} failed",
            c.total_rounds, c.ops_created, c.failures
        ));
    }

    if let Some(summary) = report.summary() {
        lines.push(format!(
            "Orders created successfully ({}):",
            summary.total_ops_created
        ));
        if summary.success_list.is_empty() {
            lines.push("  none".into());
        }
        for op in &summary.success_list {
            lines.push(format!("  NUPLAN {} -> OP {}", op.plan_id, op.created_op_id));
        }

        lines.push(format!("Failures ({}):", summary.total_failures));
        if summary.failure_list.is_empty() {
            lines.push("  none".into());
        }
        for f in &summary.failure_list {
            lines.push(format!("  NUPLAN {}: {}", f.plan_id, f.error));
        }

        lines.push(format!(
            "{} records processed, success rate {}%",
            summary.processed(),
            summary.success_rate()
        ));
    }

    if let Some(reason) = report.failure() {
        lines.push(format!("Stopped: {reason}"));
    }

    TextSummary { lines }
}
