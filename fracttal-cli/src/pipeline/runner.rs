//! Row-by-row meter update run
//!
//! Authenticates once, then resolves each report row completely (lookup,
//! delta, update, status write) before moving to the next. A row is marked
//! `OK` only after Fracttal accepted its update.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};

use super::calculator::{CategoryRules, calculate_value_to_add};
use super::events::{EventSink, LogTone, RunStats};
use crate::api::MeterApi;
use crate::report::{ReportRow, ReportStore, STATUS_OK};

/// Per-run settings applied to every meter update
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Submit readings as historical instead of current
    pub is_historical: bool,
    /// Reading timestamp for all updates; `None` stamps each update with the current time
    pub timestamp: Option<DateTime<FixedOffset>>,
}

/// How a single row was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Empty or missing identifier; not counted anywhere
    NoIdentifier,
    AlreadyProcessed,
    NoRemoteMeter,
    ZeroDelta,
    Updated,
    UpdateFailed,
}

/// Final result of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub success: bool,
    pub message: String,
    pub stats: RunStats,
    pub rows_total: usize,
}

pub struct UpdatePipeline<A, S> {
    api: A,
    store: S,
    rules: CategoryRules,
    options: RunOptions,
    events: EventSink,
    stats: RunStats,
}

impl<A: MeterApi, S: ReportStore> UpdatePipeline<A, S> {
    pub fn new(api: A, store: S, rules: CategoryRules, events: EventSink) -> Self {
        Self {
            api,
            store,
            rules,
            options: RunOptions::default(),
            events,
            stats: RunStats::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute one full run. Never fails: every error ends up in the summary
    /// and in a `Finished` event.
    pub async fn run(&mut self) -> RunSummary {
        self.stats = RunStats::default();

        match self.try_run().await {
            Ok(summary) => summary,
            Err(e) => {
                let message = format!("{:#}", e);
                self.events.log(LogTone::Error, format!("Error: {}", message));
                self.finish(false, message, 0)
            }
        }
    }

    async fn try_run(&mut self) -> Result<RunSummary> {
        self.events.log(LogTone::Muted, "Authenticating with Fracttal...");
        if !self.api.authenticate().await {
            self.events.log(LogTone::Error, "✗ Authentication failed");
            return Ok(self.finish(false, "Authentication error", 0));
        }
        self.events.log(LogTone::Success, "✓ Authentication successful");

        self.events.log(LogTone::Muted, "Loading report...");
        let rows = self.store.load().context("Failed to load report")?;
        let total = rows.len();
        self.events.log(LogTone::Success, format!("✓ {} records found", total));

        for row in &rows {
            let outcome = self.process_row(row).await;
            log::debug!("Row {} ({}): {:?}", row.index, row.internal_code, outcome);

            self.events.progress(row.index + 1, total);
            self.events.stats(self.stats);
        }

        let s = self.stats;
        log::debug!("{} of {} rows counted in stats", s.total(), total);
        self.events.log(LogTone::Info, "");
        self.events.log(LogTone::Muted, "━".repeat(40));
        self.events.log(
            LogTone::Accent,
            format!(
                "Completed: {} successful, {} failed, {} skipped, {} already processed",
                s.successful, s.failed, s.skipped, s.already_processed
            ),
        );

        Ok(self.finish(
            true,
            format!("{} successful, {} failed", s.successful, s.failed),
            total,
        ))
    }

    async fn process_row(&mut self, row: &ReportRow) -> RowOutcome {
        let id = row.internal_code.trim();
        if is_missing_identifier(id) {
            return RowOutcome::NoIdentifier;
        }

        if row.is_processed() {
            self.events
                .log(LogTone::Muted, format!("⏭ {} - Already processed", id));
            self.stats.already_processed += 1;
            return RowOutcome::AlreadyProcessed;
        }

        self.events
            .log(LogTone::Info, format!("→ {} ({})", id, row.category));

        let Some(current) = self.api.get_meter_value(id).await else {
            self.events.log(LogTone::Error, "  ✗ No meter found");
            self.stats.failed += 1;
            return RowOutcome::NoRemoteMeter;
        };

        let (delta, unit) = calculate_value_to_add(row, &self.rules);
        if delta == 0.0 {
            self.events.log(LogTone::Warning, "  ⊘ Value 0, skipped");
            self.stats.skipped += 1;
            return RowOutcome::ZeroDelta;
        }

        let new_value = current + delta;
        self.events.log(
            LogTone::Muted,
            format!("  {:.1} + {:.1} = {:.1} {}", current, delta, new_value, unit),
        );

        let result = self
            .api
            .update_meter(id, new_value, self.options.is_historical, self.options.timestamp)
            .await;

        if !result.success {
            self.events
                .log(LogTone::Error, format!("  ✗ {}", result.message));
            self.stats.failed += 1;
            return RowOutcome::UpdateFailed;
        }

        self.events.log(LogTone::Success, "  ✓ Updated");
        self.stats.successful += 1;

        // The remote update already happened; a failed write only costs a re-check next run
        if let Err(e) = self.store.mark_status(row.index, STATUS_OK) {
            self.events.log(
                LogTone::Warning,
                format!("  ⚠ Could not write status for {}: {:#}", id, e),
            );
        }

        RowOutcome::Updated
    }

    fn finish(&self, success: bool, message: impl Into<String>, rows_total: usize) -> RunSummary {
        let message = message.into();
        self.events.finished(success, message.clone());
        RunSummary {
            success,
            message,
            stats: self.stats,
            rows_total,
        }
    }
}

/// Blank cells and the textual form of a missing value do not identify an asset
fn is_missing_identifier(id: &str) -> bool {
    id.is_empty() || id.eq_ignore_ascii_case("nan")
}
