// Excel rendering of an assembled report: one worksheet per organization.

use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::extraction::record::{needs_review, ExtractionRecord, FIELD_NAMES};
use crate::extraction::report::ReportSet;

const MAX_SHEET_NAME_CHARS: usize = 31;
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

pub const COLUMN_HEADERS: [&str; 14] = [
    "Advertisement",
    "Date",
    "Post Name",
    "Vacancies",
    "Last Date",
    "Salary",
    "Location",
    "Age Limit",
    "Category",
    "Qualification",
    "Mandatory",
    "Specialization",
    "Experience (Years)",
    "Remarks",
];

const COLUMN_WIDTHS: [f64; 14] = [
    15.0, 12.0, 30.0, 25.0, 12.0, 20.0, 35.0, 10.0, 15.0, 40.0, 15.0, 30.0, 15.0, 35.0,
];

/// Columns flagged when their value needs a manual look.
const FLAGGED_FIELDS: [&str; 2] = ["last_date", "salary"];

#[derive(Error, Debug)]
pub enum ReportWriteError {
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),
}

struct SheetFormats {
    header: Format,
    cell: Format,
    flagged: Format,
}

impl SheetFormats {
    fn new() -> Self {
        let cell = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Top)
            .set_text_wrap();
        Self {
            header: Format::new()
                .set_bold()
                .set_font_size(11)
                .set_background_color(Color::RGB(0xFFFF00))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap()
                .set_border(FormatBorder::Thin),
            flagged: cell.clone().set_background_color(Color::RGB(0xFFE0E0)),
            cell,
        }
    }
}

/// Makes `raw` a legal worksheet name that is not already in `used`.
pub fn sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let base: String = if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME_CHARS).collect()
    };

    let mut candidate = base.clone();
    let mut n = 2;
    // Excel compares sheet names case-insensitively.
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.chars().count());
        candidate = base.chars().take(keep).collect::<String>() + &suffix;
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

fn write_sheet(
    worksheet: &mut Worksheet,
    positions: &[ExtractionRecord],
    formats: &SheetFormats,
) -> Result<(), XlsxError> {
    for (col, (header, width)) in COLUMN_HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *header, &formats.header)?;
        worksheet.set_column_width(col, width)?;
    }

    for (row, record) in positions.iter().enumerate() {
        let row = row as u32 + 1;
        for (col, (name, value)) in FIELD_NAMES.iter().zip(record.values()).enumerate() {
            let format = if FLAGGED_FIELDS.contains(name) && needs_review(value) {
                &formats.flagged
            } else {
                &formats.cell
            };
            worksheet.write_string_with_format(row, col as u16, value, format)?;
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Renders `report` into a workbook at `path`.
pub fn write_report_to(report: &ReportSet, path: &Path) -> Result<(), ReportWriteError> {
    let formats = SheetFormats::new();
    let mut used = HashSet::new();
    let mut workbook = Workbook::new();

    for result in report.sheets() {
        let name = sheet_name(&result.organization.to_string(), &mut used);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name)?;
        write_sheet(worksheet, &result.positions, &formats)?;
    }

    workbook.save(path)?;
    Ok(())
}

/// Writes `JobNotices_<timestamp>.xlsx` into `dir` and returns its path.
pub fn write_report(report: &ReportSet, dir: &Path) -> Result<PathBuf, ReportWriteError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportWriteError::OutputDir {
        path: dir.display().to_string(),
        source,
    })?;

    let file_name = format!("JobNotices_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(file_name);
    write_report_to(report, &path)?;

    info!(
        path = %path.display(),
        sheets = report.sheets().count(),
        total_positions = report.total_positions(),
        "Spreadsheet written"
    );
    Ok(path)
}
