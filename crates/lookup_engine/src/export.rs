use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use lookup_core::{ItemOutcome, ItemResult, VehicleRecord};
use lookup_logging::lookup_info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::persist::{AtomicFileWriter, PersistError};

pub const CSV_COLUMNS: [&str; 12] = [
    "vehicle_number",
    "report_date",
    "name_of_ownership",
    "engine_number",
    "vehicle_class",
    "conditions_and_notes",
    "make",
    "model",
    "year_of_manufacture",
    "status",
    "timestamp",
    "error",
];

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// File name without extension, e.g. `vehicle_results_20240101_120000`.
    pub file_stem: String,
    pub csv: bool,
    pub json: bool,
    /// Zip archive bundling the CSV and JSON renderings.
    pub archive: bool,
}

impl ExportOptions {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            file_stem: default_file_stem(now),
            csv: true,
            json: true,
            archive: true,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: usize,
    pub succeeded: usize,
    pub csv_path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
    pub archive_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

pub fn default_file_stem(now: DateTime<Utc>) -> String {
    format!("vehicle_results_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Pretty JSON array of tagged results, in submission order.
pub fn render_json(results: &[ItemResult]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&in_submission_order(results))?)
}

/// One header row plus one row per result, in submission order.
pub fn render_csv(results: &[ItemResult]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_COLUMNS.iter().copied());
    for result in in_submission_order(results) {
        let timestamp = result
            .finished_at
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let row: Vec<String> = match &result.outcome {
            ItemOutcome::Success { record } => {
                let mut row = record_columns(&result.identifier, record);
                row.extend(["success".to_string(), timestamp, String::new()]);
                row
            }
            ItemOutcome::Failed { reason } => {
                let mut row = vec![result.identifier.clone()];
                row.extend(std::iter::repeat(String::new()).take(8));
                row.extend([reason.tag().to_string(), timestamp, reason.to_string()]);
                row
            }
        };
        push_row(&mut out, row.iter().map(String::as_str));
    }
    out
}

/// In-memory zip with one entry per `(name, content)` pair.
pub fn build_archive(entries: &[(&str, &[u8])]) -> Result<Vec<u8>, ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(content)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Writes the requested renderings into `output_dir`.
pub fn write_exports(
    output_dir: &Path,
    results: &[ItemResult],
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let writer = AtomicFileWriter::new(output_dir.to_path_buf())?;
    let csv = render_csv(results);
    let json = render_json(results)?;
    let csv_name = format!("{}.csv", options.file_stem);
    let json_name = format!("{}.json", options.file_stem);

    let csv_path = if options.csv {
        Some(writer.write(&csv_name, csv.as_bytes())?)
    } else {
        None
    };
    let json_path = if options.json {
        Some(writer.write(&json_name, json.as_bytes())?)
    } else {
        None
    };
    let archive_path = if options.archive {
        let archive = build_archive(&[
            (csv_name.as_str(), csv.as_bytes()),
            (json_name.as_str(), json.as_bytes()),
        ])?;
        Some(writer.write(&format!("{}.zip", options.file_stem), &archive)?)
    } else {
        None
    };

    let summary = ExportSummary {
        rows: results.len(),
        succeeded: results.iter().filter(|r| r.outcome.is_success()).count(),
        csv_path,
        json_path,
        archive_path,
    };
    lookup_info!(
        "Exported {} results ({} succeeded) to {:?}",
        summary.rows,
        summary.succeeded,
        writer.dir()
    );
    Ok(summary)
}

fn in_submission_order(results: &[ItemResult]) -> Vec<&ItemResult> {
    let mut ordered: Vec<_> = results.iter().collect();
    ordered.sort_by_key(|result| result.position);
    ordered
}

fn record_columns(identifier: &str, record: &VehicleRecord) -> Vec<String> {
    vec![
        identifier.to_string(),
        record.report_date.clone(),
        record.name_of_ownership.clone(),
        record.engine_number.clone(),
        record.vehicle_class.clone(),
        record.conditions_and_notes.clone(),
        record.make.clone(),
        record.model.clone(),
        record.year_of_manufacture.clone(),
    ]
}

fn push_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let escaped: Vec<_> = fields.map(escape_field).collect();
    out.push_str(&escaped.join(","));
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
