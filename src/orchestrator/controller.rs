//! Command loop controller.
//!
//! Owns the single runner instance for an interactive session and spawns each user action
//! as its own task, so the loop keeps accepting commands while a run is in flight.

use crate::engine::AutomationRunner;
use crate::model::PlanQuery;
use anyhow::Result;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tokio::time::Duration;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    CheckConnections,
    SearchPlans(PlanQuery),
    RunAutomation,
    Quit,
}

/// Dispatch UI commands until quit, then abort in-flight work and send the shutdown beacon.
pub(crate) async fn run_controller(
    runner: AutomationRunner,
    beacon_grace: Duration,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let r = runner.clone();
                match cmd {
                    Some(UiCommand::CheckConnections) => {
                        tasks.spawn(async move {
                            r.check_connections().await;
                        });
                    }
                    Some(UiCommand::SearchPlans(query)) => {
                        tasks.spawn(async move {
                            r.search_plans(&query).await;
                        });
                    }
                    Some(UiCommand::RunAutomation) => {
                        // Re-entrant starts are rejected by the runner's own latch.
                        tasks.spawn(async move {
                            r.run_automation().await;
                        });
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "automation task failed");
                }
            }
        }
    }

    tasks.abort_all();
    send_shutdown_beacon(&runner, beacon_grace).await;
    Ok(())
}

/// Give the beacon at most `grace` to leave the process before shutdown proceeds.
pub(crate) async fn send_shutdown_beacon(runner: &AutomationRunner, grace: Duration) {
    if let Some(handle) = runner.shutdown_beacon(grace) {
        let _ = tokio::time::timeout(grace, handle).await;
    }
}
