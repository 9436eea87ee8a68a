use super::AutomationRunner;
use crate::model::{LogLevel, Summary};

impl AutomationRunner {
    /// Fetch the backend's aggregate outcome and hand it to the presenter.
    ///
    /// The backend totals are authoritative; the loop's live counters are not consulted.
    /// A failed fetch is logged and leaves whatever the presenter shows untouched.
    pub async fn report_summary(&self) -> Option<Summary> {
        match self.api.fetch_summary().await {
            Ok(summary) => {
                self.presenter.render_summary(&summary);
                self.log(
                    LogLevel::Info,
                    format!(
                        "Summary: {} succeeded, {} failed ({}% success rate)",
                        summary.total_ops_created,
                        summary.total_failures,
                        summary.success_rate()
                    ),
                );
                Some(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "summary fetch failed");
                self.log(LogLevel::Error, format!("Failed to load summary: {e}"));
                None
            }
        }
    }
}
