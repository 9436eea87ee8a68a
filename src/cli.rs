use crate::api::HttpBackend;
use crate::engine::AutomationRunner;
use crate::model::{format_date, AutomationEvent, PlanQuery, RunConfig};
use crate::orchestrator::{self, RunReport};
use crate::presenter::ChannelPresenter;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sankhya-automation",
    version,
    about = "Drive the Sankhya production-order automation with optional TUI"
)]
pub struct Cli {
    /// Base URL of the automation backend API
    #[arg(long, default_value = "http://127.0.0.1:5001/api/sankhya/")]
    pub base_url: String,

    /// Planning date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<String>,

    /// Production branch ("braço")
    #[arg(long, default_value_t = 1)]
    pub branch: u32,

    /// First round to process
    #[arg(long, default_value_t = 1)]
    pub start_round: u32,

    /// Last round to process
    #[arg(long, default_value_t = 1)]
    pub end_round: u32,

    /// Pause between rounds
    #[arg(long, default_value = "1s")]
    pub round_delay: humantime::Duration,

    /// Per-request timeout
    #[arg(long, default_value = "120s")]
    pub request_timeout: humantime::Duration,

    /// How long shutdown waits for the finalize beacon to go out
    #[arg(long, default_value = "300ms")]
    pub beacon_grace: humantime::Duration,

    /// Print JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print log lines and a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long)]
    pub silent: bool,

    /// Stop after counting pending plans (text/JSON modes)
    #[arg(long)]
    pub no_run: bool,

    /// Export the run report as JSON
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            crate::logging::init();
            return run_headless(args).await;
        }
    }

    crate::logging::init();
    run_headless(args).await
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        base_url: args.base_url.clone(),
        round_delay: Duration::from(args.round_delay),
        request_timeout: Duration::from(args.request_timeout),
        beacon_grace: Duration::from(args.beacon_grace),
        user_agent: format!("sankhya-automation/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Initial form values from CLI arguments; the date defaults to today (local time).
pub fn build_query(args: &Cli) -> PlanQuery {
    let planning_date = args.date.clone().unwrap_or_else(|| {
        let now = time::OffsetDateTime::now_local()
            .unwrap_or_else(|_| time::OffsetDateTime::now_utc());
        format_date(now.date())
    });
    PlanQuery {
        planning_date,
        branch: args.branch,
        start_round: args.start_round,
        end_round: args.end_round,
    }
}

/// Text and JSON modes: run every phase in order without user interaction.
async fn run_headless(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let backend = Arc::new(HttpBackend::new(&cfg)?);
    let base_url = backend.base_url().to_string();
    let query = build_query(&args);

    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AutomationEvent>();
    let runner = AutomationRunner::new(
        backend,
        Arc::new(ChannelPresenter::new(evt_tx)),
        cfg.round_delay,
    );

    // Only text mode shows the live log; JSON mode consumes events silently.
    let printer = tokio::spawn(print_events(evt_rx, args.text.then(|| out_tx.clone())));

    let finished = tokio::select! {
        report = orchestrator::run_workflow(&runner, &base_url, &query, args.no_run) => Some(report),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(report) = finished else {
        orchestrator::send_shutdown_beacon(&runner, cfg.beacon_grace).await;
        return Err(anyhow::anyhow!("interrupted"));
    };

    // Dropping the runner closes the event channel so the printer drains and exits.
    drop(runner);
    let _ = printer.await;

    if let Some(p) = args.export_json.as_deref() {
        orchestrator::export_json(p, &report)?;
        if !args.silent {
            let _ = out_tx.send(OutputLine::Stderr(format!("Exported: {}", p.display())));
        }
    }

    if args.json {
        if !args.silent {
            let out = serde_json::to_string_pretty(&report).context("serialize run report")?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        }
    } else {
        print_text_summary(&report, &out_tx);
    }

    drop(out_tx);
    let _ = out_handle.await;

    match report.failure() {
        Some(reason) => Err(anyhow::anyhow!(reason)),
        None => Ok(()),
    }
}

async fn print_events(
    mut evt_rx: mpsc::UnboundedReceiver<AutomationEvent>,
    out_tx: Option<mpsc::UnboundedSender<OutputLine>>,
) {
    while let Some(ev) = evt_rx.recv().await {
        let Some(tx) = out_tx.as_ref() else {
            continue;
        };
        match ev {
            AutomationEvent::Log {
                level,
                timestamp,
                message,
            } => {
                let _ = tx.send(OutputLine::Stderr(format!(
                    "[{timestamp}] {:<5} {message}",
                    level.label()
                )));
            }
            AutomationEvent::Progress { percent } => {
                let _ = tx.send(OutputLine::Stderr(format!("Progress: {percent}%")));
            }
            _ => {}
        }
    }
}

fn print_text_summary(report: &RunReport, out_tx: &mpsc::UnboundedSender<OutputLine>) {
    let summary = crate::text_summary::build_text_summary(report);
    for line in summary.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }
}
