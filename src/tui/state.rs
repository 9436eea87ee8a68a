use crate::model::{Action, AutomationEvent, LogLevel, PlanQuery, RunOutcome, Summary};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

pub const FIELD_LABELS: [&str; 4] = ["Planning date", "Branch", "Start round", "End round"];
const FIELD_MAX_LEN: usize = 10;
const LOG_MAX: usize = 500;

pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: String,
    pub message: String,
}

#[derive(Default)]
pub struct UiState {
    pub tab: usize,
    pub info: String,

    // Form: date, branch, start round, end round
    pub fields: [String; 4],
    pub selected_field: usize,

    pub search_visible: bool,
    pub run_visible: bool,
    pub running: bool,

    pub progress_visible: bool,
    pub progress_percent: u64,
    pub ops_created: u64,
    pub failures: u64,
    pub current_round: u32,

    pub log: Vec<LogEntry>,
    pub summary: Option<Summary>,
}

impl UiState {
    pub fn with_query(q: &PlanQuery) -> Self {
        Self {
            fields: [
                q.planning_date.clone(),
                q.branch.to_string(),
                q.start_round.to_string(),
                q.end_round.to_string(),
            ],
            ..Default::default()
        }
    }

    pub fn push_log(&mut self, level: LogLevel, timestamp: String, message: String) {
        self.log.push(LogEntry {
            level,
            timestamp,
            message,
        });
        if self.log.len() > LOG_MAX {
            let _ = self.log.drain(0..(self.log.len() - LOG_MAX));
        }
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.info = "Log cleared".into();
    }

    pub fn select_next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % FIELD_LABELS.len();
    }

    pub fn select_prev_field(&mut self) {
        self.selected_field = (self.selected_field + FIELD_LABELS.len() - 1) % FIELD_LABELS.len();
    }

    /// Date accepts digits and dashes; numeric fields accept digits only.
    pub fn type_char(&mut self, c: char) {
        let allowed = c.is_ascii_digit() || (self.selected_field == 0 && c == '-');
        let field = &mut self.fields[self.selected_field];
        if allowed && field.len() < FIELD_MAX_LEN {
            field.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.fields[self.selected_field].pop();
    }

    /// Form contents as a query; date validation is left to the runner.
    pub fn query(&self) -> Result<PlanQuery, String> {
        let number = |idx: usize| -> Result<u32, String> {
            self.fields[idx]
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("{} must be a whole number", FIELD_LABELS[idx]))
        };
        Ok(PlanQuery {
            planning_date: self.fields[0].trim().to_string(),
            branch: number(1)?,
            start_round: number(2)?,
            end_round: number(3)?,
        })
    }

    pub fn apply_event(&mut self, ev: AutomationEvent) {
        match ev {
            AutomationEvent::Log {
                level,
                timestamp,
                message,
            } => self.push_log(level, timestamp, message),
            AutomationEvent::ActionVisibility { action, visible } => match action {
                Action::SearchPlans => self.search_visible = visible,
                Action::RunAutomation => self.run_visible = visible,
            },
            AutomationEvent::ProgressVisible => {
                self.progress_visible = true;
                self.running = true;
                self.progress_percent = 0;
                self.ops_created = 0;
                self.failures = 0;
            }
            AutomationEvent::Progress { percent } => self.progress_percent = percent,
            AutomationEvent::Counters {
                ops_created,
                failures,
                current_round,
            } => {
                self.ops_created = ops_created;
                self.failures = failures;
                self.current_round = current_round;
            }
            AutomationEvent::SummaryReady { summary } => self.summary = Some(*summary),
            AutomationEvent::RunFinished { outcome } => {
                self.running = false;
                self.info = match outcome {
                    RunOutcome::Completed { .. } => "Automation finished".into(),
                    RunOutcome::Aborted { error } => format!("Automation aborted: {error}"),
                    RunOutcome::Rejected | RunOutcome::NotReady => String::new(),
                };
            }
        }
    }
}

pub fn level_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Info => Style::default().fg(Color::Gray),
        LogLevel::Success => Style::default().fg(Color::Green),
        LogLevel::Warning => Style::default().fg(Color::Yellow),
        LogLevel::Error => Style::default().fg(Color::Red),
    }
}

/// Wrap `label: value` over several lines so long backend messages stay readable.
pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    style: Style,
    area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(line_text, style),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(line_text, style),
            ]));
        }

        remaining = rest;
    }
}
