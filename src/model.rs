use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use time::macros::format_description;
use time::Date;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub round_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub beacon_grace: Duration,
    pub user_agent: String,
}

/// Raw form input for a plan search, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanQuery {
    pub planning_date: String,
    pub branch: u32,
    pub start_round: u32,
    pub end_round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("planning date is required")]
    MissingDate,
    #[error("invalid planning date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("start round ({start}) cannot be greater than end round ({end})")]
    InvertedRounds { start: u32, end: u32 },
}

/// Validated parameters of one automation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowParameters {
    planning_date: Date,
    branch: u32,
    start_round: u32,
    end_round: u32,
}

impl WorkflowParameters {
    /// Planning date in the `YYYY-MM-DD` form the backend expects.
    pub fn planning_date_str(&self) -> String {
        format_date(self.planning_date)
    }

    pub fn branch(&self) -> u32 {
        self.branch
    }

    pub fn start_round(&self) -> u32 {
        self.start_round
    }

    pub fn end_round(&self) -> u32 {
        self.end_round
    }

    pub fn total_rounds(&self) -> u64 {
        u64::from(self.end_round - self.start_round) + 1
    }
}

impl TryFrom<&PlanQuery> for WorkflowParameters {
    type Error = ValidationError;

    fn try_from(q: &PlanQuery) -> Result<Self, Self::Error> {
        let raw = q.planning_date.trim();
        if raw.is_empty() {
            return Err(ValidationError::MissingDate);
        }
        let planning_date = parse_date(raw)?;
        if q.start_round > q.end_round {
            return Err(ValidationError::InvertedRounds {
                start: q.start_round,
                end: q.end_round,
            });
        }
        Ok(Self {
            planning_date,
            branch: q.branch,
            start_round: q.start_round,
            end_round: q.end_round,
        })
    }
}

pub fn parse_date(raw: &str) -> Result<Date, ValidationError> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

pub fn format_date(d: Date) -> String {
    d.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| d.to_string())
}

/// Live counters of the round loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub is_processing: bool,
    pub current_round: u32,
    pub total_rounds: u64,
    pub ops_created: u64,
    pub failures: u64,
}

impl RunState {
    pub fn reset(&mut self, total_rounds: u64) {
        *self = Self {
            total_rounds,
            ..Default::default()
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub success: bool,
    pub ops_created: u64,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOp {
    pub plan_id: i64,
    pub created_op_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPlan {
    pub plan_id: i64,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_ops_created: u64,
    pub total_failures: u64,
    pub success_list: Vec<CreatedOp>,
    pub failure_list: Vec<FailedPlan>,
}

impl Summary {
    pub fn processed(&self) -> u64 {
        self.total_ops_created.saturating_add(self.total_failures)
    }

    pub fn success_rate(&self) -> u64 {
        rounded_percent(self.total_ops_created, self.processed())
    }
}

/// `round(100 * part / whole)`, rounding halves up; 0 when `whole` is 0.
pub fn rounded_percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    part.saturating_mul(200).saturating_add(whole) / whole.saturating_mul(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-triggerable steps whose availability the runner toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    SearchPlans,
    RunAutomation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// All rounds were attempted; `summary` is `None` when the summary fetch failed.
    Completed { summary: Option<Box<Summary>> },
    Aborted { error: String },
    /// Another run was already active.
    Rejected,
    /// No successful plan search preceded the run.
    NotReady,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AutomationEvent {
    Log {
        level: LogLevel,
        timestamp: String,
        message: String,
    },
    ActionVisibility {
        action: Action,
        visible: bool,
    },
    ProgressVisible,
    Progress {
        percent: u64,
    },
    Counters {
        ops_created: u64,
        failures: u64,
        current_round: u32,
    },
    SummaryReady {
        // Box to keep the enum small; summaries can carry long lists.
        summary: Box<Summary>,
    },
    RunFinished {
        outcome: RunOutcome,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(date: &str, start: u32, end: u32) -> PlanQuery {
        PlanQuery {
            planning_date: date.into(),
            branch: 2,
            start_round: start,
            end_round: end,
        }
    }

    #[test]
    fn rejects_missing_date() {
        let err = WorkflowParameters::try_from(&query("  ", 1, 2)).unwrap_err();
        assert_eq!(err, ValidationError::MissingDate);
    }

    #[test]
    fn rejects_inverted_rounds() {
        let err = WorkflowParameters::try_from(&query("2024-05-10", 5, 2)).unwrap_err();
        assert_eq!(err, ValidationError::InvertedRounds { start: 5, end: 2 });
    }

    #[test]
    fn rejects_malformed_date() {
        let err = WorkflowParameters::try_from(&query("10/05/2024", 1, 1)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDate(_)));
    }

    #[test]
    fn single_round_range_is_valid() {
        let p = WorkflowParameters::try_from(&query("2024-05-10", 3, 3)).unwrap();
        assert_eq!(p.total_rounds(), 1);
        assert_eq!(p.planning_date_str(), "2024-05-10");
        assert_eq!(p.branch(), 2);
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(rounded_percent(1, 3), 33);
        assert_eq!(rounded_percent(2, 3), 67);
        assert_eq!(rounded_percent(1, 8), 13);
        assert_eq!(rounded_percent(3, 3), 100);
        assert_eq!(rounded_percent(0, 0), 0);
    }

    #[test]
    fn success_rate_uses_backend_totals() {
        let s = Summary {
            total_ops_created: 7,
            total_failures: 3,
            ..Default::default()
        };
        assert_eq!(s.success_rate(), 70);
        assert_eq!(Summary::default().success_rate(), 0);
    }

    #[test]
    fn absurd_backend_totals_do_not_overflow() {
        let s = Summary {
            total_ops_created: u64::MAX,
            total_failures: u64::MAX,
            ..Default::default()
        };
        assert_eq!(s.processed(), u64::MAX);
        assert!(s.success_rate() <= 100);
    }
}
