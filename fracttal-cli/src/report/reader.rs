//! Read report rows from an activity report workbook

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use chrono::{NaiveDate, TimeDelta};

use super::ReportRow;
use crate::config::ReportLayout;

/// Column positions (absolute, 0-based) resolved from the header row
#[derive(Debug, Default)]
pub(crate) struct ColumnIndices {
    pub id_col: Option<u32>,
    pub category_col: Option<u32>,
    pub distance_col: Option<u32>,
    pub running_time_col: Option<u32>,
    pub status_col: Option<u32>,
}

/// Read every data row below the header of the first worksheet
pub fn read_report(path: &Path, layout: &ReportLayout) -> Result<Vec<ReportRow>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .context("Excel file has no sheets")?
        .clone();

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

    rows_from_range(&range, layout)
}

pub(crate) fn rows_from_range(
    range: &Range<Data>,
    layout: &ReportLayout,
) -> Result<Vec<ReportRow>> {
    let header_row = layout.header_index();
    let (Some(_), Some((end_row, _))) = (range.start(), range.end()) else {
        anyhow::bail!("Report sheet is empty");
    };
    if end_row < header_row {
        anyhow::bail!(
            "Report has no header row: expected headers on row {}",
            layout.header_row
        );
    }

    let cols = parse_header(range, layout);
    if cols.id_col.is_none() {
        anyhow::bail!(
            "Column '{}' not found in header row {}",
            layout.id_column,
            layout.header_row
        );
    }
    for (col, name) in [
        (cols.category_col, &layout.category_column),
        (cols.distance_col, &layout.distance_column),
        (cols.running_time_col, &layout.running_time_column),
    ] {
        if col.is_none() {
            log::warn!("Column '{}' not found, treating it as empty", name);
        }
    }

    let read = |row: u32, col: Option<u32>| -> String {
        col.and_then(|c| range.get_value((row, c)))
            .map(cell_to_string)
            .unwrap_or_default()
    };

    let rows = (header_row + 1..=end_row)
        .enumerate()
        .map(|(index, row)| ReportRow {
            index,
            internal_code: read(row, cols.id_col).trim().to_string(),
            category: read(row, cols.category_col).trim().to_string(),
            distance_km: read(row, cols.distance_col),
            running_time: read(row, cols.running_time_col),
            status: read(row, cols.status_col),
        })
        .collect();

    Ok(rows)
}

/// Locate the configured columns by trimmed header text
pub(crate) fn parse_header(range: &Range<Data>, layout: &ReportLayout) -> ColumnIndices {
    let mut indices = ColumnIndices::default();
    let (Some((_, start_col)), Some((_, end_col))) = (range.start(), range.end()) else {
        return indices;
    };

    let names: HashMap<String, u32> = (start_col..=end_col)
        .rev()
        .filter_map(|col| {
            let name = range
                .get_value((layout.header_index(), col))
                .map(cell_to_string)?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), col))
        })
        .collect();

    let find = |name: &str| names.get(name.trim()).copied();
    indices.id_col = find(&layout.id_column);
    indices.category_col = find(&layout.category_column);
    indices.distance_col = find(&layout.distance_column);
    indices.running_time_col = find(&layout.running_time_column);
    indices.status_col = find(&layout.status_column);
    indices
}

/// Textual form of a cell, as the calculator and status check expect it
pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            let days = dt.as_f64();
            if dt.is_duration() || (0.0..1.0).contains(&days) {
                format_hours_minutes(days)
            } else {
                format_excel_datetime(days)
            }
        }
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Excel stores times as fractions of a day; render them as `H:MM`.
///
/// Rounded to whole seconds first to absorb float noise, then seconds are dropped.
fn format_hours_minutes(days: f64) -> String {
    let secs = (days * 86_400.0).round() as i64;
    format!("{}:{:02}", secs / 3600, (secs % 3600) / 60)
}

/// Serial day number (1900 date system) as `YYYY-MM-DD HH:MM:SS`
fn format_excel_datetime(days: f64) -> String {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0));
    let seconds = (days * 86_400.0).round() as i64;
    epoch
        .and_then(|e| e.checked_add_signed(TimeDelta::seconds(seconds)))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| days.to_string())
}
