//! Scripted backend and event capture shared by the runner tests.

use crate::api::{ApiError, ApiResult, SankhyaApi};
use crate::model::{AutomationEvent, LogLevel, PlanQuery, RoundResult, Summary, WorkflowParameters};
use crate::presenter::ChannelPresenter;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::AutomationRunner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Verify,
    Search,
    Round(u32),
    Summary,
    Finalize,
}

pub enum Reply {
    Round(RoundResult),
    Transport(String),
    Fatal(String),
}

pub fn ops(n: u64) -> Reply {
    Reply::Round(RoundResult {
        success: true,
        ops_created: n,
        message: None,
        error: None,
    })
}

pub fn failed(erro: &str) -> Reply {
    Reply::Round(RoundResult {
        success: false,
        ops_created: 0,
        message: None,
        error: Some(erro.into()),
    })
}

#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<Call>>,
    pub verify: Mutex<Option<Result<String, String>>>,
    pub search_total: Mutex<Option<Result<u64, String>>>,
    pub rounds: Mutex<HashMap<u32, Reply>>,
    pub summary: Mutex<Option<Summary>>,
    pub finalize_fails: bool,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn round_calls(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Round(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn transport(msg: &str) -> ApiError {
    // A decode failure stands in for any non-fatal transport problem.
    ApiError::Decode {
        status: 502,
        source: serde_json::from_str::<serde_json::Value>(msg).unwrap_err(),
    }
}

#[async_trait]
impl SankhyaApi for FakeApi {
    async fn verify_connections(&self) -> ApiResult<String> {
        self.record(Call::Verify);
        match self.verify.lock().unwrap().clone() {
            Some(Ok(m)) => Ok(m),
            Some(Err(e)) => Err(ApiError::Backend(e)),
            None => Err(transport("<html>")),
        }
    }

    async fn search_plans(&self, _params: &WorkflowParameters) -> ApiResult<u64> {
        self.record(Call::Search);
        match self.search_total.lock().unwrap().clone() {
            Some(Ok(n)) => Ok(n),
            Some(Err(e)) => Err(ApiError::Backend(e)),
            None => Err(transport("<html>")),
        }
    }

    async fn process_round(
        &self,
        _params: &WorkflowParameters,
        round: u32,
    ) -> ApiResult<RoundResult> {
        self.record(Call::Round(round));
        match self.rounds.lock().unwrap().remove(&round) {
            Some(Reply::Round(r)) => Ok(r),
            Some(Reply::Transport(m)) => Err(transport(&m)),
            Some(Reply::Fatal(m)) => Err(ApiError::InvalidRequest(m)),
            None => Ok(RoundResult {
                success: true,
                ops_created: 1,
                message: None,
                error: None,
            }),
        }
    }

    async fn fetch_summary(&self) -> ApiResult<Summary> {
        self.record(Call::Summary);
        self.summary
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::Backend("summary unavailable".into()))
    }

    async fn finalize_connections(&self) -> ApiResult<()> {
        self.record(Call::Finalize);
        if self.finalize_fails {
            Err(transport("connection reset"))
        } else {
            Ok(())
        }
    }
}

pub const ROUND_DELAY: Duration = Duration::from_millis(1000);

pub fn runner(api: Arc<FakeApi>) -> (AutomationRunner, UnboundedReceiver<AutomationEvent>) {
    runner_with_delay(api, ROUND_DELAY)
}

pub fn runner_with_delay(
    api: Arc<FakeApi>,
    round_delay: Duration,
) -> (AutomationRunner, UnboundedReceiver<AutomationEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let runner = AutomationRunner::new(api, Arc::new(ChannelPresenter::new(tx)), round_delay);
    (runner, rx)
}

pub fn drain(rx: &mut UnboundedReceiver<AutomationEvent>) -> Vec<AutomationEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

pub fn logs(events: &[AutomationEvent], level: LogLevel) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            AutomationEvent::Log { level: l, message, .. } if *l == level => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn query(start: u32, end: u32) -> PlanQuery {
    PlanQuery {
        planning_date: "2024-05-10".into(),
        branch: 1,
        start_round: start,
        end_round: end,
    }
}

/// Runner whose last search found pending plans for `start..=end`.
pub async fn ready_runner(
    api: Arc<FakeApi>,
    start: u32,
    end: u32,
) -> (AutomationRunner, UnboundedReceiver<AutomationEvent>) {
    ready_runner_with_delay(api, start, end, ROUND_DELAY).await
}

pub async fn ready_runner_with_delay(
    api: Arc<FakeApi>,
    start: u32,
    end: u32,
    round_delay: Duration,
) -> (AutomationRunner, UnboundedReceiver<AutomationEvent>) {
    *api.search_total.lock().unwrap() = Some(Ok(5));
    let (runner, mut rx) = runner_with_delay(api, round_delay);
    assert_eq!(runner.search_plans(&query(start, end)).await, Some(5));
    drain(&mut rx);
    (runner, rx)
}
