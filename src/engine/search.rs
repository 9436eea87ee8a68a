use super::AutomationRunner;
use crate::model::{Action, LogLevel, PlanQuery, WorkflowParameters};

impl AutomationRunner {
    /// Validate the form input and count pending plans in range.
    ///
    /// Returns the pending count, or `None` when validation or the request failed.
    /// Only a positive count makes the run action available.
    pub async fn search_plans(&self, query: &PlanQuery) -> Option<u64> {
        let params = match WorkflowParameters::try_from(query) {
            Ok(p) => p,
            Err(e) => {
                self.log(LogLevel::Error, e.to_string());
                return None;
            }
        };

        self.log(
            LogLevel::Info,
            format!(
                "Searching plans for {}, branch {}, rounds {}-{}...",
                params.planning_date_str(),
                params.branch(),
                params.start_round(),
                params.end_round()
            ),
        );

        match self.api.search_plans(&params).await {
            Ok(total) if total > 0 => {
                {
                    let mut st = self.lock_state();
                    if !st.is_processing {
                        st.total_rounds = params.total_rounds();
                    }
                }
                self.set_ready_parameters(Some(params));
                self.log(LogLevel::Success, format!("Found {total} pending plans"));
                self.presenter.set_action_visible(Action::RunAutomation, true);
                Some(total)
            }
            Ok(total) => {
                self.set_ready_parameters(None);
                self.log(LogLevel::Warning, "No pending plans found");
                self.presenter.set_action_visible(Action::RunAutomation, false);
                Some(total)
            }
            Err(e) => {
                tracing::warn!(error = %e, "plan search failed");
                self.set_ready_parameters(None);
                self.log(LogLevel::Error, format!("Failed to search plans: {e}"));
                self.presenter.set_action_visible(Action::RunAutomation, false);
                None
            }
        }
    }
}
