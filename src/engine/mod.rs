//! Automation runner: the four workflow phases driven against a [`SankhyaApi`].
//!
//! Each phase lives in its own module as an `impl AutomationRunner` block. The runner is
//! a cheap handle; clones share the same run state so a second run started from
//! another task observes the processing latch.

mod connection;
mod rounds;
mod search;
mod summary;

#[cfg(test)]
pub(crate) mod testing;

use crate::api::SankhyaApi;
use crate::model::{LogLevel, RunState, WorkflowParameters};
use crate::presenter::Presenter;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};
use std::time::Duration;

#[derive(Default)]
struct Shared {
    // Never held across an await.
    state: Mutex<RunState>,
    // Parameters of the last search that found pending plans.
    params: Mutex<Option<WorkflowParameters>>,
    used: AtomicBool,
}

#[derive(Clone)]
pub struct AutomationRunner {
    api: Arc<dyn SankhyaApi>,
    presenter: Arc<dyn Presenter>,
    round_delay: Duration,
    shared: Arc<Shared>,
}

impl AutomationRunner {
    pub fn new(
        api: Arc<dyn SankhyaApi>,
        presenter: Arc<dyn Presenter>,
        round_delay: Duration,
    ) -> Self {
        Self {
            api,
            presenter,
            round_delay,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn state(&self) -> RunState {
        *self.lock_state()
    }

    /// Whether any backend session may have been opened by this runner.
    pub fn has_been_used(&self) -> bool {
        self.shared.used.load(Ordering::Relaxed)
    }

    pub fn ready_parameters(&self) -> Option<WorkflowParameters> {
        *lock(&self.shared.params)
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        lock(&self.shared.state)
    }

    fn set_ready_parameters(&self, params: Option<WorkflowParameters>) {
        *lock(&self.shared.params) = params;
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?level, %message, "automation log");
        self.presenter.append_log(level, message);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AutomationRunner {
    /// Fire-and-forget finalize request for shutdown, sent only if the backend was used.
    ///
    /// The request is bounded by `grace` and its result is discarded.
    pub fn shutdown_beacon(&self, grace: Duration) -> Option<tokio::task::JoinHandle<()>> {
        if !self.has_been_used() {
            return None;
        }
        tracing::debug!("sending shutdown beacon");
        let api = self.api.clone();
        Some(tokio::spawn(async move {
            let _ = tokio::time::timeout(grace, api.finalize_connections()).await;
        }))
    }
}
