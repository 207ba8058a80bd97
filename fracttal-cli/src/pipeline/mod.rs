//! Meter update pipeline
//!
//! Reads report rows, computes each asset's delta and pushes the new
//! accumulated value to Fracttal, reporting progress through [`EventSink`].

pub mod calculator;
pub mod events;
pub mod runner;

pub use calculator::CategoryRules;
pub use events::{EventSink, LogTone, RunEvent, RunStats};
pub use runner::{RunOptions, UpdatePipeline};
