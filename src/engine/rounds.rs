use super::AutomationRunner;
use crate::api::ApiError;
use crate::model::{rounded_percent, Action, LogLevel, RunOutcome, WorkflowParameters};

impl AutomationRunner {
    /// Process every round of the last successful search, then show the summary.
    ///
    /// At most one run is active per runner; a concurrent start is rejected with a
    /// warning and issues no request.
    pub async fn run_automation(&self) -> RunOutcome {
        let params = match self.begin_run() {
            Ok(p) => p,
            Err(outcome) => return outcome,
        };

        self.presenter.set_action_visible(Action::RunAutomation, false);
        self.presenter.show_progress_section();
        self.log(LogLevel::Info, "Starting production order automation...");

        let outcome = match self.process_rounds(&params).await {
            Ok(()) => {
                self.log(LogLevel::Success, "Automation finished!");
                let summary = self.report_summary().await;
                RunOutcome::Completed {
                    summary: summary.map(Box::new),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "automation aborted");
                self.log(LogLevel::Error, format!("Automation aborted: {e}"));
                RunOutcome::Aborted {
                    error: e.to_string(),
                }
            }
        };

        self.end_run().await;
        self.presenter.run_finished(&outcome);
        outcome
    }

    fn begin_run(&self) -> Result<WorkflowParameters, RunOutcome> {
        let mut st = self.lock_state();
        if st.is_processing {
            drop(st);
            self.log(LogLevel::Warning, "Automation is already running");
            return Err(RunOutcome::Rejected);
        }
        let Some(params) = self.ready_parameters() else {
            drop(st);
            self.log(
                LogLevel::Warning,
                "Search for pending plans before starting the automation",
            );
            return Err(RunOutcome::NotReady);
        };
        st.reset(params.total_rounds());
        st.is_processing = true;
        Ok(params)
    }

    /// Per-round failures are counted and skipped; only fatal errors end the loop.
    async fn process_rounds(&self, params: &WorkflowParameters) -> Result<(), ApiError> {
        let total = params.total_rounds();

        for round in params.start_round()..=params.end_round() {
            let (ops, failures) = {
                let mut st = self.lock_state();
                st.current_round = round;
                (st.ops_created, st.failures)
            };
            self.presenter.set_counters(ops, failures, round);
            self.log(LogLevel::Info, format!("--- Processing round {round} ---"));

            match self.api.process_round(params, round).await {
                Ok(r) if r.success => {
                    if r.ops_created > 0 {
                        let mut st = self.lock_state();
                        st.ops_created = st.ops_created.saturating_add(r.ops_created);
                        drop(st);
                        self.log(
                            LogLevel::Success,
                            format!("Round {round}: {} orders created", r.ops_created),
                        );
                    } else {
                        self.log(LogLevel::Warning, format!("Round {round}: no orders created"));
                    }
                    if let Some(message) = r.message {
                        self.log(LogLevel::Info, message);
                    }
                }
                Ok(r) => {
                    self.lock_state().failures += 1;
                    let erro = r.error.unwrap_or_else(|| "unknown error".into());
                    self.log(LogLevel::Error, format!("Round {round}: {erro}"));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    self.lock_state().failures += 1;
                    self.log(LogLevel::Error, format!("Round {round}: {e}"));
                }
            }

            let st = self.state();
            self.presenter
                .set_counters(st.ops_created, st.failures, st.current_round);
            let done = u64::from(round - params.start_round()) + 1;
            self.presenter.set_progress(rounded_percent(done, total));

            if round < params.end_round() {
                tokio::time::sleep(self.round_delay).await;
            }
        }
        Ok(())
    }

    /// Release the latch and close backend sessions; a failed finalize is only a warning.
    async fn end_run(&self) {
        self.lock_state().is_processing = false;
        self.presenter.set_action_visible(Action::RunAutomation, true);

        match self.api.finalize_connections().await {
            Ok(()) => self.log(LogLevel::Info, "Connections finalized"),
            Err(e) => self.log(
                LogLevel::Warning,
                format!("Failed to finalize connections: {e}"),
            ),
        }
    }
}
