//! Update command handler: runs the pipeline and renders its events

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use colored::*;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;

use super::UpdateCommands;
use crate::api::FracttalClient;
use crate::config::{Config, Credentials};
use crate::pipeline::{EventSink, LogTone, RunEvent, RunOptions, RunStats, UpdatePipeline};
use crate::report::XlsxReport;

/// Handle the update command. Returns whether the run succeeded.
pub async fn handle_update_command(
    args: UpdateCommands,
    config: Config,
    verbose: bool,
) -> Result<bool> {
    // Missing credentials abort before the report is touched
    let credentials = Credentials::from_env()?;

    if !args.file.exists() {
        anyhow::bail!("Report file does not exist: {}", args.file.display());
    }
    let is_xlsx = args
        .file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if !is_xlsx {
        anyhow::bail!("Report must be an .xlsx file: {}", args.file.display());
    }

    let timestamp = args
        .timestamp
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;

    let client = FracttalClient::new(&config.api, credentials)?;
    let report = XlsxReport::new(&args.file, config.report.clone());

    println!("Report: {}", report.path().display().to_string().cyan());
    if args.historical {
        println!("{}", "Readings will be submitted as historical".yellow());
    }

    let (sink, rx) = EventSink::channel();
    let mut pipeline = UpdatePipeline::new(client, report, config.categories.clone(), sink)
        .with_options(RunOptions {
            is_historical: args.historical,
            timestamp,
        });

    let start = Instant::now();
    let task = tokio::spawn(async move { pipeline.run().await });

    let view = render_events(rx, verbose).await;

    let summary = match task.await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{} {}", "✗ Update run aborted:".red().bold(), e);
            return Ok(false);
        }
    };

    print_summary(&view, &summary.stats, summary.rows_total);
    if verbose {
        println!("Total time: {:.2}s", start.elapsed().as_secs_f64());
    }

    if summary.success {
        println!("{} {}", "✓ Process completed:".green().bold(), summary.message);
    } else {
        eprintln!("{} {}", "✗ Process failed:".red().bold(), summary.message);
    }

    Ok(summary.success)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).with_context(|| {
        format!(
            "Invalid --timestamp '{}', expected RFC 3339 (e.g. 2024-05-01T10:00:00-03:00)",
            raw
        )
    })
}

/// Progress the terminal has seen so far
#[derive(Debug, Default)]
struct RunView {
    current: usize,
    total: usize,
}

/// Print events until the pipeline drops its sender
async fn render_events(mut rx: UnboundedReceiver<RunEvent>, verbose: bool) -> RunView {
    let mut view = RunView::default();

    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Log { tone, message } => println!("{}", style_line(tone, &message)),
            RunEvent::Progress { current, total } => {
                view.current = current;
                view.total = total;
            }
            RunEvent::Stats(stats) if verbose => {
                let line = format!(
                    "[{}/{}] ok {} / failed {} / skipped {} / done before {}",
                    view.current,
                    view.total,
                    stats.successful,
                    stats.failed,
                    stats.skipped,
                    stats.already_processed
                );
                println!("{}", line.dimmed());
            }
            RunEvent::Stats(_) => {}
            RunEvent::Finished { .. } => {}
        }
    }

    view
}

fn style_line(tone: LogTone, message: &str) -> ColoredString {
    match tone {
        LogTone::Info => message.normal(),
        LogTone::Muted => message.dimmed(),
        LogTone::Success => message.green(),
        LogTone::Warning => message.yellow(),
        LogTone::Error => message.red(),
        LogTone::Accent => message.cyan().bold(),
    }
}

fn print_summary(view: &RunView, stats: &RunStats, rows_total: usize) {
    println!();
    if rows_total > 0 {
        println!("Rows processed: {}/{}", view.current, rows_total);
    }
    println!(
        "{}  {}  {}  {}",
        format!("Successful: {}", stats.successful).green(),
        format!("Failed: {}", stats.failed).red(),
        format!("Skipped: {}", stats.skipped).yellow(),
        format!("Already processed: {}", stats.already_processed).dimmed(),
    );
}
