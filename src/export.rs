//! Export of the current result set.
//!
//! With a run id and a backend that can build an export URL, the URL is
//! handed to an [`ExportSink`] to open; the SDK never downloads it. Without
//! one, the artifact is produced locally from the loaded rows.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::client::RankingBackend;
use crate::error::{RankingError, Result};
use crate::models::RankingRow;

pub const CSV_FILE_NAME: &str = "sp_rankings.csv";
pub const SHEET_FILE_STEM: &str = "sp-ranking";
pub const SHEET_NAME: &str = "Ranking";
pub const SHEET_HEADERS: [&str; 7] = [
    "Symbol", "Name", "Score", "Price", "Change1D", "Change1W", "Change1M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    /// Value of the `format` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
        }
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Serialize objects to CSV.
///
/// The header is the union of all keys in order of first appearance; fields
/// containing a comma, quote or newline are quoted with doubled quotes.
/// Returns an empty string for no rows.
pub fn array_to_csv(rows: &[Map<String, Value>]) -> Result<String> {
    if rows.is_empty() {
        return Ok(String::new());
    }
    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key.as_str());
            }
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|h| cell(row.get(*h))))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| RankingError::Io(e.into_error()))?;
    let mut out = String::from_utf8(bytes)
        .map_err(|e| RankingError::InvalidArgument(format!("CSV is not UTF-8: {e}")))?;
    if out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

/// [`array_to_csv`] over ranking rows, using their camelCase field names.
pub fn rows_to_csv(rows: &[RankingRow]) -> Result<String> {
    let objects = rows
        .iter()
        .map(|r| -> Result<Map<String, Value>> {
            match serde_json::to_value(r)? {
                Value::Object(map) => Ok(map),
                _ => Err(RankingError::InvalidArgument(
                    "row did not serialize to an object".into(),
                )),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    array_to_csv(&objects)
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

/// One worksheet: fixed headers and rows of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

fn round2(v: f64) -> Value {
    if v.is_finite() {
        Value::from((v * 100.0).round() / 100.0)
    } else {
        Value::Null
    }
}

/// Build the `Ranking` sheet; numeric columns are rounded to 2 decimals.
pub fn build_sheet(rows: &[RankingRow]) -> Sheet {
    Sheet {
        name: SHEET_NAME.to_string(),
        headers: SHEET_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    Value::from(r.symbol.clone()),
                    Value::from(r.name.clone()),
                    r.display_score().map(round2).unwrap_or(Value::Null),
                    round2(r.price),
                    round2(r.change_1d),
                    round2(r.change_1w),
                    round2(r.change_1m),
                ]
            })
            .collect(),
    }
}

/// Encodes a [`Sheet`] into file bytes.
pub trait SheetWriter: Send + Sync {
    /// File extension without the dot.
    fn extension(&self) -> &str;
    fn write(&self, sheet: &Sheet) -> Result<Vec<u8>>;
}

/// Writes the sheet as CSV, which every spreadsheet application opens.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvSheetWriter;

impl SheetWriter for CsvSheetWriter {
    fn extension(&self) -> &str {
        "csv"
    }

    fn write(&self, sheet: &Sheet) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&sheet.headers)?;
        for row in &sheet.rows {
            writer.write_record(row.iter().map(|v| cell(Some(v))))?;
        }
        writer
            .into_inner()
            .map_err(|e| RankingError::Io(e.into_error()))
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Where export artifacts go.
///
/// Hosts that can open a browser or download manager implement this and pass
/// it to [`crate::RankingSdkBuilder::export_sink`]; the SDK itself never
/// fetches a server export URL.
pub trait ExportSink: Send + Sync {
    /// Hand a server export URL to whatever opens downloads.
    fn open_url(&self, url: &str) -> Result<()>;

    /// Persist a locally generated artifact and return where it went.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Saves artifacts into a directory.
///
/// Server export URLs are only logged at `info` and never opened or
/// downloaded. Supply a custom [`ExportSink`] to actually dispatch them.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for DirectorySink {
    fn open_url(&self, url: &str) -> Result<()> {
        info!(%url, "Server export ready for download");
        Ok(())
    }

    /// Written to a temp file first and renamed, so a failed write never
    /// leaves a partial export behind.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let dest = self.dir.join(file_name);
        let tmp = self.dir.join(format!("{file_name}.tmp"));
        let result = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, &dest));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        info!(path = %dest.display(), bytes = bytes.len(), "Saved export");
        Ok(dest)
    }
}

// ---------------------------------------------------------------------------
// ExportCoordinator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// A server export URL was handed to the sink.
    Dispatched(String),
    /// A local artifact was written.
    Saved(PathBuf),
    /// Nothing to export.
    Skipped,
}

/// Export is possible with a run id or at least one loaded row.
pub fn can_export(run_id: Option<&str>, rows: &[RankingRow]) -> bool {
    run_id.is_some_and(|id| !id.is_empty()) || !rows.is_empty()
}

/// Chooses between server-side and local export.
pub struct ExportCoordinator {
    backend: Arc<dyn RankingBackend>,
    sink: Arc<dyn ExportSink>,
    sheet_writer: Arc<dyn SheetWriter>,
}

impl ExportCoordinator {
    pub fn new(
        backend: Arc<dyn RankingBackend>,
        sink: Arc<dyn ExportSink>,
        sheet_writer: Arc<dyn SheetWriter>,
    ) -> Self {
        Self {
            backend,
            sink,
            sheet_writer,
        }
    }

    pub fn export_csv(&self, run_id: Option<&str>, rows: &[RankingRow]) -> Result<ExportOutcome> {
        self.export(ExportFormat::Csv, run_id, rows)
    }

    pub fn export_excel(&self, run_id: Option<&str>, rows: &[RankingRow]) -> Result<ExportOutcome> {
        self.export(ExportFormat::Excel, run_id, rows)
    }

    pub fn export(
        &self,
        format: ExportFormat,
        run_id: Option<&str>,
        rows: &[RankingRow],
    ) -> Result<ExportOutcome> {
        if !can_export(run_id, rows) {
            debug!(format = format.as_str(), "Nothing to export");
            return Ok(ExportOutcome::Skipped);
        }

        if let Some(url) = run_id.and_then(|id| self.backend.export_url(id, format)) {
            self.sink.open_url(&url)?;
            return Ok(ExportOutcome::Dispatched(url));
        }

        if rows.is_empty() {
            debug!(format = format.as_str(), "No server export and no loaded rows");
            return Ok(ExportOutcome::Skipped);
        }
        let path = match format {
            ExportFormat::Csv => {
                let csv = rows_to_csv(rows)?;
                self.sink.save(CSV_FILE_NAME, csv.as_bytes())?
            }
            ExportFormat::Excel => {
                let bytes = self.sheet_writer.write(&build_sheet(rows))?;
                let name = format!("{}.{}", SHEET_FILE_STEM, self.sheet_writer.extension());
                self.sink.save(&name, &bytes)?
            }
        };
        Ok(ExportOutcome::Saved(path))
    }
}
