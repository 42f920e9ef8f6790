use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use keno_core::DrawResult;
use keno_logging::{keno_debug, keno_info};
use tempfile::NamedTempFile;

/// Column titles of the CSV export.
pub const CSV_HEADER: [&str; 3] = ["Тираж", "Дата", "Числа"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Json, ExportFormat::Csv];

    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Json => "keno-archive.json",
            ExportFormat::Csv => "keno-archive.csv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv;charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub format: ExportFormat,
    pub row_count: usize,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("output directory {path:?} is unusable: {source}")]
    OutputDir { path: PathBuf, source: io::Error },
    #[error("writing export file failed: {0}")]
    Io(#[from] io::Error),
}

pub fn encode(results: &[DrawResult], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(to_json(results)?),
        ExportFormat::Csv => Ok(to_csv(results)),
    }
}

/// Pretty-printed JSON array with two-space indentation.
pub fn to_json(results: &[DrawResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(results)
}

/// Header plus one row per draw, rows separated by `\n` with no trailing newline.
///
/// Fields are written as-is without quoting. Draw numbers and the joined
/// numbers can never contain a comma; a date containing one would shift the
/// columns of its row.
pub fn to_csv(results: &[DrawResult]) -> String {
    let mut lines = Vec::with_capacity(results.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for draw in results {
        let numbers = draw
            .numbers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("{},{},{}", draw.draw_number, draw.date, numbers));
    }
    lines.join("\n")
}

/// Encodes `results` and writes them to `{output_dir}/{format.file_name()}`.
///
/// An earlier export of the same format is replaced by a single rename, so the
/// path always holds either the previous archive or the complete new one.
pub fn write_export(
    output_dir: &Path,
    results: &[DrawResult],
    format: ExportFormat,
) -> Result<ExportSummary, ExportError> {
    let content = encode(results, format)?;
    prepare_output_dir(output_dir)?;
    let path = output_dir.join(format.file_name());
    replace_contents(output_dir, &path, content.as_bytes())?;
    keno_info!(
        "Exported {} draw(s) as {} to {:?}",
        results.len(),
        format,
        path
    );

    Ok(ExportSummary {
        format,
        row_count: results.len(),
        path,
    })
}

fn prepare_output_dir(dir: &Path) -> Result<(), ExportError> {
    let unusable = |source: io::Error| ExportError::OutputDir {
        path: dir.to_path_buf(),
        source,
    };
    if !dir.exists() {
        keno_debug!("Creating export directory {:?}", dir);
        fs::create_dir_all(dir).map_err(unusable)?;
    } else if !dir.is_dir() {
        return Err(unusable(io::Error::other("not a directory")));
    }
    Ok(())
}

// The temp file lives next to `path` so the final rename stays on one filesystem.
fn replace_contents(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file_mut().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}
