//! Events emitted by an update run
//!
//! The pipeline reports through an unbounded channel so a slow consumer never
//! stalls it. Every log line is mirrored to the `log` facade.

use tokio::sync::mpsc;

/// Severity or role of a log line, used by front ends to pick a style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTone {
    /// Regular progress information
    Info,
    /// Secondary detail (computations, skipped rows)
    Muted,
    Success,
    Warning,
    Error,
    /// Run summary
    Accent,
}

/// Counters for one run; they only ever increase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub already_processed: usize,
}

impl RunStats {
    pub fn total(&self) -> usize {
        self.successful + self.failed + self.skipped + self.already_processed
    }
}

/// Update sent while a run is in progress
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Human-readable log line
    Log { tone: LogTone, message: String },
    /// Row `current` of `total` has been handled (1-based)
    Progress { current: usize, total: usize },
    /// Counters as of the latest row
    Stats(RunStats),
    /// Run ended; `success` is false for aborted runs
    Finished { success: bool, message: String },
}

/// Sending half of the event channel
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl EventSink {
    /// Create a sink and the receiver a front end consumes
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Send an event (non-blocking); a closed receiver is ignored
    pub fn send(&self, event: RunEvent) {
        let _ = self.tx.send(event);
    }

    pub fn log(&self, tone: LogTone, message: impl Into<String>) {
        let message = message.into();
        match tone {
            LogTone::Error => log::error!("{}", message),
            LogTone::Warning => log::warn!("{}", message),
            _ => log::info!("{}", message),
        }
        self.send(RunEvent::Log { tone, message });
    }

    pub fn progress(&self, current: usize, total: usize) {
        self.send(RunEvent::Progress { current, total });
    }

    pub fn stats(&self, stats: RunStats) {
        self.send(RunEvent::Stats(stats));
    }

    pub fn finished(&self, success: bool, message: impl Into<String>) {
        self.send(RunEvent::Finished {
            success,
            message: message.into(),
        });
    }
}
