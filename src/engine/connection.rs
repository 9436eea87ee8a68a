use super::AutomationRunner;
use crate::api::ApiError;
use crate::model::{Action, LogLevel};
use std::sync::atomic::Ordering;

impl AutomationRunner {
    /// Verify backend connectivity; reveals the plan search on success.
    pub async fn check_connections(&self) -> bool {
        self.shared.used.store(true, Ordering::Relaxed);
        self.log(LogLevel::Info, "Checking backend connections...");

        match self.api.verify_connections().await {
            Ok(message) => {
                self.log(LogLevel::Success, message);
                self.presenter.set_action_visible(Action::SearchPlans, true);
                true
            }
            Err(ApiError::Backend(erro)) => {
                self.log(LogLevel::Error, erro);
                self.presenter.set_action_visible(Action::SearchPlans, false);
                self.presenter.set_action_visible(Action::RunAutomation, false);
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "connection check failed");
                self.log(LogLevel::Error, format!("Failed to check connections: {e}"));
                self.presenter.set_action_visible(Action::SearchPlans, false);
                self.presenter.set_action_visible(Action::RunAutomation, false);
                false
            }
        }
    }
}
