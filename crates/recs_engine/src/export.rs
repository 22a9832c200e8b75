use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use recs_core::RecommendationOutcome;
use serde::Serialize;
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export directory unusable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize recommendations: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub record_count: usize,
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    profile_id: &'a str,
    generated_utc: &'a str,
    record_count: usize,
    #[serde(flatten)]
    outcome: &'a RecommendationOutcome,
}

/// File name used for a profile's export; unsafe characters become `_`.
pub fn export_filename(profile_id: &str) -> String {
    let slug: String = profile_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("recommendations-{slug}.json")
}

/// Writes the outcome as pretty JSON into `dir`, replacing any previous export.
///
/// The file is written to a temp file in the same directory and renamed into
/// place, so readers never see a partial document.
pub fn export_outcome(
    dir: &Path,
    profile_id: &str,
    generated_utc: &str,
    outcome: &RecommendationOutcome,
) -> Result<ExportSummary, ExportError> {
    ensure_export_dir(dir)?;

    let record_count = outcome.records().len();
    let document = ExportDocument {
        profile_id,
        generated_utc,
        record_count,
        outcome,
    };
    let content = serde_json::to_string_pretty(&document)?;

    let target = dir.join(export_filename(profile_id));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(&target).map_err(|e| ExportError::Io(e.error))?;

    Ok(ExportSummary {
        path: target,
        record_count,
    })
}

fn ensure_export_dir(dir: &Path) -> Result<(), ExportError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| ExportError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(ExportError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| ExportError::OutputDir(e.to_string()))
}
