//! Write a status marker back into the activity report
//!
//! Neither calamine nor rust_xlsxwriter edits a workbook in place, so the file
//! is read in full and rewritten. Cell values (strings, numbers, booleans,
//! dates and durations) and formulas survive the rewrite. Cell styles do not.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};

use super::reader::{cell_to_string, parse_header};
use crate::config::ReportLayout;

/// Number formats used when re-emitting date cells
mod formats {
    pub const DURATION: &str = "[h]:mm:ss";
    pub const TIME: &str = "h:mm";
    pub const DATETIME: &str = "yyyy-mm-dd hh:mm:ss";
}

/// One worksheet as read back: cached values plus formula text
struct SheetContents {
    name: String,
    values: Range<Data>,
    formulas: Range<String>,
}

impl SheetContents {
    /// Last used column across values and formulas
    fn last_col(&self) -> Option<u32> {
        let values = self.values.end().map(|(_, col)| col);
        let formulas = self.formulas.end().map(|(_, col)| col);
        values.max(formulas)
    }
}

/// Write `status` into the status column for the row with ordinal `row_index`.
///
/// The status column is created after the last used column when the header row
/// does not have one. The row lands on sheet row `header_row + 1 + row_index`.
pub fn write_status(
    path: &Path,
    layout: &ReportLayout,
    row_index: usize,
    status: &str,
) -> Result<()> {
    let sheets = read_all_sheets(path)?;
    let first = sheets.first().context("Excel file has no sheets")?;

    let header_row = layout.header_index();
    let status_col = match parse_header(&first.values, layout).status_col {
        Some(col) => col,
        None => first.last_col().map(|col| col + 1).unwrap_or(0),
    };
    let target_row = header_row + 1 + u32::try_from(row_index).context("Row index out of range")?;

    let mut workbook = Workbook::new();
    for (idx, sheet) in sheets.iter().enumerate() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        copy_range(worksheet, &sheet.values)?;
        copy_formulas(worksheet, &sheet.formulas, &sheet.values)?;

        if idx == 0 {
            worksheet.write_string(header_row, status_col as u16, &layout.status_column)?;
            worksheet.write_string(target_row, status_col as u16, status)?;
        }
    }

    save_replacing(&mut workbook, path)
}

fn read_all_sheets(path: &Path) -> Result<Vec<SheetContents>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let values = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Failed to read sheet: {}", name))?;
        let formulas = workbook
            .worksheet_formula(&name)
            .with_context(|| format!("Failed to read formulas of sheet: {}", name))?;
        sheets.push(SheetContents {
            name,
            values,
            formulas,
        });
    }
    Ok(sheets)
}

fn copy_range(ws: &mut Worksheet, range: &Range<Data>) -> Result<()> {
    let Some((start_row, start_col)) = range.start() else {
        return Ok(());
    };
    for (row, col, cell) in range.cells() {
        let row = start_row + row as u32;
        let col = (start_col as usize + col) as u16;
        write_cell(ws, row, col, cell)?;
    }
    Ok(())
}

/// Re-emit formulas over the copied values, keeping the cached result
fn copy_formulas(ws: &mut Worksheet, formulas: &Range<String>, values: &Range<Data>) -> Result<()> {
    let Some((start_row, start_col)) = formulas.start() else {
        return Ok(());
    };
    for (row, col, text) in formulas.cells() {
        if text.is_empty() {
            continue;
        }
        let row = start_row + row as u32;
        let col = start_col + col as u32;
        let mut formula = Formula::new(text.as_str());
        if let Some(cached) = values.get_value((row, col)) {
            formula = formula.set_result(cell_to_string(cached));
        }
        ws.write_formula(row, col as u16, formula)?;
    }
    Ok(())
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, cell: &Data) -> Result<()> {
    match cell {
        Data::Empty | Data::Error(_) => { /* Leave cell empty */ }
        Data::String(s) => { ws.write_string(row, col, s)?; }
        Data::Int(i) => { ws.write_number(row, col, *i as f64)?; }
        Data::Float(f) => { ws.write_number(row, col, *f)?; }
        Data::Bool(b) => { ws.write_boolean(row, col, *b)?; }
        Data::DateTime(dt) => {
            let value = dt.as_f64();
            let num_format = if dt.is_duration() {
                formats::DURATION
            } else if (0.0..1.0).contains(&value) {
                formats::TIME
            } else {
                formats::DATETIME
            };
            let format = Format::new().set_num_format(num_format);
            ws.write_number_with_format(row, col, value, &format)?;
        }
        Data::DateTimeIso(_) | Data::DurationIso(_) => {
            ws.write_string(row, col, cell_to_string(cell))?;
        }
    }
    Ok(())
}

/// Save next to the original, then rename over it
fn save_replacing(workbook: &mut Workbook, path: &Path) -> Result<()> {
    let tmp = temp_path(path);
    workbook
        .save(&tmp)
        .with_context(|| format!("Failed to save Excel file: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace Excel file: {}", path.display()))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.xlsx".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
