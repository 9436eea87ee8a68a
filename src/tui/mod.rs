mod help;
mod state;

use crate::api::HttpBackend;
use crate::cli::{build_config, build_query, Cli};
use crate::engine::AutomationRunner;
use crate::model::{AutomationEvent, LogLevel};
use crate::orchestrator::{self, UiCommand};
use crate::presenter::{log_timestamp, ChannelPresenter};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{level_style, push_wrapped_status_kv, UiState, FIELD_LABELS};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let backend = Arc::new(HttpBackend::new(&cfg)?);

    // Unbounded channels avoid backpressure between the runner and the render loop.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AutomationEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let runner = AutomationRunner::new(
        backend,
        Arc::new(ChannelPresenter::new(event_tx)),
        cfg.round_delay,
    );

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let initial = UiState::with_query(&build_query(&args));
    let base_url = cfg.base_url.clone();
    let ui_handle =
        std::thread::spawn(move || run_threaded(initial, base_url, event_rx, cmd_tx));

    let res = orchestrator::run_controller(runner, cfg.beacon_grace, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    base_url: String,
    mut event_rx: UnboundedReceiver<AutomationEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    state.info = "Press c to check connections".into();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state, &base_url)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::CheckConnections);
                    }
                    (_, KeyCode::Char('s')) => {
                        if !state.search_visible {
                            state.info = "Check connections first".into();
                        } else {
                            match state.query() {
                                Ok(q) => {
                                    state.summary = None;
                                    let _ = cmd_tx.send(UiCommand::SearchPlans(q));
                                }
                                Err(msg) => state.push_log(LogLevel::Error, log_timestamp(), msg),
                            }
                        }
                    }
                    (_, KeyCode::Char('r')) => {
                        if state.run_visible {
                            state.summary = None;
                            let _ = cmd_tx.send(UiCommand::RunAutomation);
                        } else if state.running {
                            state.info = "Automation is already running".into();
                        } else {
                            state.info = "Search for pending plans first".into();
                        }
                    }
                    (_, KeyCode::Char('l')) => state.clear_log(),
                    (_, KeyCode::Char('?')) => state.tab = 1,
                    (_, KeyCode::Tab) => state.tab = (state.tab + 1) % 2,
                    (_, KeyCode::Up) => state.select_prev_field(),
                    (_, KeyCode::Down) => state.select_next_field(),
                    (_, KeyCode::Backspace) => state.backspace(),
                    (_, KeyCode::Char(ch)) => state.type_char(ch),
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, base_url: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Automation"), Line::from("Help")])
        .select(state.tab)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("sankhya-automation · {base_url}")),
        )
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_dashboard(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let summary_height = if state.summary.is_some() { 9 } else { 0 };
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(6),              // Form + actions
                Constraint::Length(4),              // Progress + counters
                Constraint::Length(summary_height), // Final summary
                Constraint::Min(0),                 // Log panel
                Constraint::Length(3),              // Status row
            ]
            .as_ref(),
        )
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main[0]);
    draw_form(top[0], f, state);
    draw_actions(top[1], f, state);
    draw_progress(main[1], f, state);
    if summary_height > 0 {
        draw_summary(main[2], f, state);
    }
    draw_log(main[3], f, state);

    let status = Paragraph::new(state.info.clone())
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, main[4]);
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let lines: Vec<Line> = FIELD_LABELS
        .iter()
        .zip(state.fields.iter())
        .enumerate()
        .map(|(i, (label, value))| {
            let selected = i == state.selected_field;
            let marker = if selected { "›" } else { " " };
            let value_style = if selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::raw(format!("{marker} {label:<14}")),
                Span::styled(value.clone(), value_style),
            ])
        })
        .collect();
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Parameters"));
    f.render_widget(p, area);
}

fn draw_actions(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let action = |key: &'static str, label: &'static str, enabled: bool| {
        let style = if enabled {
            Style::default().fg(Color::Magenta)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Line::from(vec![
            Span::styled(format!("[{key}] "), style),
            Span::styled(label, if enabled { Style::default() } else { style }),
        ])
    };
    let p = Paragraph::new(vec![
        action("c", "Check connections", true),
        action("s", "Search pending plans", state.search_visible),
        action("r", "Run automation", state.run_visible),
        action("q", "Quit", true),
    ])
    .block(Block::default().borders(Borders::ALL).title("Actions"));
    f.render_widget(p, area);
}

fn draw_progress(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title(format!(
        "Round {}  •  orders created {}  •  failures {}",
        state.current_round, state.ops_created, state.failures
    ));
    if !state.progress_visible {
        f.render_widget(Paragraph::new("No run yet").block(block), area);
        return;
    }
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(state.progress_percent.min(100) as u16)
        .label(format!("{}%", state.progress_percent));
    f.render_widget(gauge, area);
}

fn draw_summary(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let Some(summary) = state.summary.as_ref() else {
        return;
    };
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let mut ok_lines: Vec<Line> = summary
        .success_list
        .iter()
        .map(|op| Line::from(format!("NUPLAN {} → OP {}", op.plan_id, op.created_op_id)))
        .collect();
    if ok_lines.is_empty() {
        ok_lines.push(Line::from(Span::styled(
            "No orders created",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let ok = Paragraph::new(ok_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Created ({})", summary.total_ops_created))
            .border_style(Style::default().fg(Color::Green)),
    );
    f.render_widget(ok, cols[0]);

    let mut fail_lines: Vec<Line<'static>> = Vec::new();
    for fp in &summary.failure_list {
        push_wrapped_status_kv(
            &mut fail_lines,
            &format!("NUPLAN {}", fp.plan_id),
            &fp.error,
            Style::default().fg(Color::Red),
            cols[1].width,
        );
    }
    if fail_lines.is_empty() {
        fail_lines.push(Line::from(Span::styled(
            "No failures recorded",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let failed = Paragraph::new(fail_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(
                "Failed ({})  •  {} processed, {}% success",
                summary.total_failures,
                summary.processed(),
                summary.success_rate()
            ))
            .border_style(Style::default().fg(Color::Red)),
    );
    f.render_widget(failed, cols[1]);
}

fn draw_log(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    // Keep the newest lines in view.
    let visible = area.height.saturating_sub(2) as usize;
    let start = state.log.len().saturating_sub(visible);
    let lines: Vec<Line> = state.log[start..]
        .iter()
        .map(|e| {
            Line::from(vec![
                Span::styled(format!("[{}] ", e.timestamp), Style::default().fg(Color::DarkGray)),
                Span::styled(e.message.clone(), level_style(e.level)),
            ])
        })
        .collect();
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Log"));
    f.render_widget(p, area);
}
