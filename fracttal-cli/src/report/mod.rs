//! Activity report I/O
//!
//! The report is an `.xlsx` export with a block of preamble rows above the
//! header. Rows are identified by their 0-based ordinal below the header; the
//! same ordinal locates the status cell when it is written back.

mod reader;
mod writer;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::ReportLayout;

pub use reader::read_report;
pub use writer::write_status;

/// Marker written into the status column after a successful update
pub const STATUS_OK: &str = "OK";

/// One asset's line in the activity report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRow {
    /// 0-based ordinal below the header row
    pub index: usize,
    pub internal_code: String,
    pub category: String,
    pub distance_km: String,
    pub running_time: String,
    pub status: String,
}

impl ReportRow {
    /// Whether a previous run already marked this row as done
    pub fn is_processed(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(STATUS_OK)
    }
}

/// Source of report rows that can persist a per-row status
pub trait ReportStore: Send + Sync {
    fn load(&self) -> Result<Vec<ReportRow>>;

    fn mark_status(&self, row_index: usize, status: &str) -> Result<()>;
}

/// Report backed by an `.xlsx` file on disk
#[derive(Debug, Clone)]
pub struct XlsxReport {
    path: PathBuf,
    layout: ReportLayout,
}

impl XlsxReport {
    pub fn new(path: impl Into<PathBuf>, layout: ReportLayout) -> Self {
        Self {
            path: path.into(),
            layout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportStore for XlsxReport {
    fn load(&self) -> Result<Vec<ReportRow>> {
        read_report(&self.path, &self.layout)
    }

    fn mark_status(&self, row_index: usize, status: &str) -> Result<()> {
        write_status(&self.path, &self.layout, row_index, status)
    }
}
