//! End-of-run report artifacts
//!
//! Each non-empty outcome list becomes its own JSON array file. Empty lists
//! produce no file at all, so the presence of a report means something needs
//! attention.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::config::{OutputFormat, ReportConfig};
use crate::duplicate::DuplicateReason;
use crate::error::{ErrorKind, Result};
use crate::health::HealthSummary;
use crate::pipeline::RunSummary;
use crate::store::RecordId;

pub const DUPLICATE_REPORT: &str = "duplicate_report.json";
pub const VALIDATION_REPORT: &str = "validation_report.json";
pub const LOAD_ERROR_REPORT: &str = "load_error_report.json";
pub const HEALTH_REPORT: &str = "file_health_report.json";

/// A file skipped because an equivalent study is already stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub file: PathBuf,
    pub reason: DuplicateReason,
    pub value: String,
    pub existing_id: RecordId,
}

/// A file rejected by schema validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub file: PathBuf,
    pub error: String,
    pub instance_path: String,
}

/// A file that could not be read, decoded or stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadErrorEntry {
    pub file: PathBuf,
    pub error_type: ErrorKind,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

/// Writes report artifacts into a directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    format: OutputFormat,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(&config.output_dir, config.output_format)
    }

    /// Write the duplicate, validation and load-error reports of a run.
    ///
    /// Returns the paths actually written.
    pub fn write_run_reports(&self, summary: &RunSummary) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        written.extend(self.write_if_any(DUPLICATE_REPORT, &summary.duplicates)?);
        written.extend(self.write_if_any(VALIDATION_REPORT, &summary.validation_failures)?);
        written.extend(self.write_if_any(LOAD_ERROR_REPORT, &summary.load_failures)?);
        Ok(written)
    }

    /// Write the health report if any file had an issue
    pub fn write_health_report(&self, summary: &HealthSummary) -> Result<Option<PathBuf>> {
        self.write_if_any(HEALTH_REPORT, &summary.issues)
    }

    fn write_if_any<T: Serialize>(&self, name: &str, entries: &[T]) -> Result<Option<PathBuf>> {
        if entries.is_empty() {
            return Ok(None);
        }

        let content = match self.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(entries)?,
            OutputFormat::Compact => serde_json::to_string(entries)?,
        };

        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(name);
        fs::write(&path, content)?;
        info!(path = %path.display(), entries = entries.len(), "report written");
        Ok(Some(path))
    }
}
