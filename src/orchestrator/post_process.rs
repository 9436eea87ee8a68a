//! Non-interactive workflow sequencing and run reports.
//!
//! Drives the phases in order for text/JSON modes and collects what happened into a
//! serialisable [`RunReport`] for printing and export.

use crate::engine::AutomationRunner;
use crate::model::{PlanQuery, RunOutcome, RunState, Summary};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Everything a non-interactive run produced, ready for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunReport {
    pub timestamp_utc: String,
    pub base_url: String,
    pub query: PlanQuery,
    pub connected: bool,
    pub pending_plans: Option<u64>,
    pub outcome: Option<RunOutcome>,
    /// Counters kept by the round loop; the backend summary is authoritative.
    pub live_counters: RunState,
}

impl RunReport {
    fn new(base_url: &str, query: &PlanQuery) -> Self {
        Self {
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            base_url: base_url.to_string(),
            query: query.clone(),
            connected: false,
            pending_plans: None,
            outcome: None,
            live_counters: RunState::default(),
        }
    }

    pub fn summary(&self) -> Option<&Summary> {
        match &self.outcome {
            Some(RunOutcome::Completed { summary }) => summary.as_deref(),
            _ => None,
        }
    }

    /// Why the workflow stopped short, if it did. No pending plans is not a failure.
    pub fn failure(&self) -> Option<String> {
        if !self.connected {
            return Some("backend connection check failed".into());
        }
        if self.pending_plans.is_none() {
            return Some("plan search failed".into());
        }
        match &self.outcome {
            Some(RunOutcome::Aborted { error }) => Some(format!("automation aborted: {error}")),
            Some(RunOutcome::Rejected) => Some("automation was already running".into()),
            _ => None,
        }
    }
}

/// Run connection check, plan search and (unless `search_only`) the automation in order.
pub(crate) async fn run_workflow(
    runner: &AutomationRunner,
    base_url: &str,
    query: &PlanQuery,
    search_only: bool,
) -> RunReport {
    let mut report = RunReport::new(base_url, query);

    report.connected = runner.check_connections().await;
    if !report.connected {
        return report;
    }

    report.pending_plans = runner.search_plans(query).await;
    let pending = report.pending_plans.unwrap_or(0);
    if search_only || pending == 0 {
        return report;
    }

    report.outcome = Some(runner.run_automation().await);
    report.live_counters = runner.state();
    report
}

/// Write the report as pretty JSON, creating parent directories as needed.
pub(crate) fn export_json(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export directory {}", parent.display()))?;
    }
    let out = serde_json::to_string_pretty(report).context("serialize run report")?;
    std::fs::write(path, out).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
