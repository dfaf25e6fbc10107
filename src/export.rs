// CSV export of projected rows
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use clap::ValueEnum;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::ProcessedRecord;
use crate::extraction::{Row, RowProjector};
use crate::types::Result;

/// Column-name fragments of identifier, phone and postal-code columns.
/// Spreadsheets would otherwise read these as numbers and drop leading zeros.
pub const STRING_COLUMN_PATTERNS: [&str; 8] = [
    "IC",
    "PH",
    "no_mykad",
    "no_mykid",
    "telefon",
    "poskod",
    "no_akaun",
    "no_pengenalan",
];

pub const SOURCE_FILE_COLUMN: &str = "source_file";

const EVERYTHING_LEADING: [&str; 4] = ["pemohon_no_mykad", "Card Number", "Minimal Detail", "Details"];
const MINIMAL_LEADING: [&str; 3] = ["IC", "Card Number", "Details"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    #[default]
    Everything,
    Minimal,
}

/// Rows of a batch under one column order
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl ExportTable {
    pub fn build(records: &[ProcessedRecord], mode: ExportMode, projector: &RowProjector) -> Self {
        let mut seen: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(records.len());

        for processed in records {
            let mut row: Row = match mode {
                ExportMode::Everything => projector.everything(&processed.record),
                ExportMode::Minimal => projector.minimal(&processed.record),
            };
            row.push((SOURCE_FILE_COLUMN.to_string(), processed.source_file.clone()));

            for (column, _) in &row {
                if !seen.contains(column) {
                    seen.push(column.clone());
                }
            }
            rows.push(row.into_iter().collect());
        }

        Self {
            columns: order_columns(&seen, mode),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything: primary ID and summaries first, then the per-role and child
/// fields, then `document_*`, then the source file. Minimal: `IC`, card
/// number and details first, then the rest, then the source file.
pub fn order_columns(columns: &[String], mode: ExportMode) -> Vec<String> {
    let has = |name: &str| columns.iter().any(|c| c == name);
    let leading: Vec<String> = match mode {
        ExportMode::Everything => EVERYTHING_LEADING.as_slice(),
        ExportMode::Minimal => MINIMAL_LEADING.as_slice(),
    }
    .iter()
    .filter(|name| has(name))
    .map(|name| name.to_string())
    .collect();

    let is_document = |c: &String| mode == ExportMode::Everything && c.starts_with("document_");
    let middle = columns
        .iter()
        .filter(|c| !leading.contains(c) && c.as_str() != SOURCE_FILE_COLUMN && !is_document(c));
    let documents = columns.iter().filter(|c| is_document(c));

    let mut ordered = leading.clone();
    ordered.extend(middle.cloned());
    ordered.extend(documents.cloned());
    if has(SOURCE_FILE_COLUMN) {
        ordered.push(SOURCE_FILE_COLUMN.to_string());
    }
    ordered
}

pub fn is_text_column(column: &str) -> bool {
    STRING_COLUMN_PATTERNS.iter().any(|p| column.contains(p))
}

/// Wrap a value as a spreadsheet text formula
fn force_text(value: &str) -> String {
    format!("=\"{}\"", value.replace('"', "\"\""))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter {
    pub mode: ExportMode,
    /// Write ID-like columns as `="…"` so spreadsheets keep them as text
    pub excel_text: bool,
}

impl CsvExporter {
    pub fn new(mode: ExportMode, excel_text: bool) -> Self {
        Self { mode, excel_text }
    }

    pub fn write<W: Write>(&self, records: &[ProcessedRecord], projector: &RowProjector, writer: W) -> Result<usize> {
        let table = ExportTable::build(records, self.mode, projector);
        let mut csv = WriterBuilder::new().from_writer(writer);
        csv.write_record(&table.columns)?;

        for row in &table.rows {
            let values = table.columns.iter().map(|column| {
                let value = row.get(column).map(String::as_str).unwrap_or("");
                if self.excel_text && !value.is_empty() && is_text_column(column) {
                    force_text(value)
                } else {
                    value.to_string()
                }
            });
            csv.write_record(values)?;
        }
        csv.flush()?;
        Ok(table.len())
    }

    pub fn write_path(&self, records: &[ProcessedRecord], projector: &RowProjector, path: &Path) -> Result<usize> {
        let file = File::create(path)?;
        let written = self.write(records, projector, file)?;
        info!("Wrote {} row(s) to {}", written, path.display());
        Ok(written)
    }
}
