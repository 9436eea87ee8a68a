//! Presentation port written to by the automation runner.
//!
//! The runner never renders anything itself; it reports through [`Presenter`], and the
//! channel implementation forwards everything as [`AutomationEvent`]s to whichever
//! presentation layer (TUI, text, JSON) is active.

use crate::model::{Action, AutomationEvent, LogLevel, RunOutcome, Summary};
use tokio::sync::mpsc::UnboundedSender;

pub trait Presenter: Send + Sync {
    fn append_log(&self, level: LogLevel, message: String);
    fn set_action_visible(&self, action: Action, visible: bool);
    fn show_progress_section(&self);
    fn set_progress(&self, percent: u64);
    fn set_counters(&self, ops_created: u64, failures: u64, current_round: u32);
    fn render_summary(&self, summary: &Summary);
    fn run_finished(&self, outcome: &RunOutcome);
}

/// Local wall-clock time for log lines, falling back to UTC when the offset is unknown.
pub fn log_timestamp() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(time::macros::format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "--:--:--".into())
}

/// Forwards every presenter call as an event; a closed channel is ignored.
#[derive(Clone)]
pub struct ChannelPresenter {
    tx: UnboundedSender<AutomationEvent>,
}

impl ChannelPresenter {
    pub fn new(tx: UnboundedSender<AutomationEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, ev: AutomationEvent) {
        let _ = self.tx.send(ev);
    }
}

impl Presenter for ChannelPresenter {
    fn append_log(&self, level: LogLevel, message: String) {
        self.emit(AutomationEvent::Log {
            level,
            timestamp: log_timestamp(),
            message,
        });
    }

    fn set_action_visible(&self, action: Action, visible: bool) {
        self.emit(AutomationEvent::ActionVisibility { action, visible });
    }

    fn show_progress_section(&self) {
        self.emit(AutomationEvent::ProgressVisible);
    }

    fn set_progress(&self, percent: u64) {
        self.emit(AutomationEvent::Progress { percent });
    }

    fn set_counters(&self, ops_created: u64, failures: u64, current_round: u32) {
        self.emit(AutomationEvent::Counters {
            ops_created,
            failures,
            current_round,
        });
    }

    fn render_summary(&self, summary: &Summary) {
        self.emit(AutomationEvent::SummaryReady {
            summary: Box::new(summary.clone()),
        });
    }

    fn run_finished(&self, outcome: &RunOutcome) {
        self.emit(AutomationEvent::RunFinished {
            outcome: outcome.clone(),
        });
    }
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "OK",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}
