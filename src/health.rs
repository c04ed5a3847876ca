//! File health check
//!
//! A lighter pass than an import: decode each file and look for a handful of
//! required fields. Nothing is validated against the schema and no store is
//! opened.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::DiscoveryConfig;
use crate::discover::discover_files;
use crate::error::{ImportError, Result};

/// Fields a file must carry to count as healthy
pub const HEALTH_REQUIRED_FIELDS: &[&str] = &["title", "year", "doi", "ml_approaches"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthIssueKind {
    #[serde(rename = "Missing required fields")]
    MissingFields,
    #[serde(rename = "JSON Decode Error")]
    DecodeError,
    #[serde(rename = "Unreadable file")]
    Unreadable,
}

impl HealthIssueKind {
    pub fn label(&self) -> &'static str {
        match self {
            HealthIssueKind::MissingFields => "Missing required fields",
            HealthIssueKind::DecodeError => "JSON Decode Error",
            HealthIssueKind::Unreadable => "Unreadable file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HealthDetails {
    Fields(Vec<String>),
    Message(String),
}

/// One problematic file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub file: PathBuf,
    pub issue: HealthIssueKind,
    pub details: HealthDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub issues: Vec<HealthIssue>,
}

impl HealthSummary {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check every study file under `root`
pub fn scan(root: &Path, discovery: &DiscoveryConfig) -> Result<HealthSummary> {
    if !root.is_dir() {
        return Err(ImportError::MissingRoot {
            path: root.to_path_buf(),
        });
    }

    let mut summary = HealthSummary::default();
    for path in discover_files(root, discovery) {
        summary.total += 1;
        match check_file(&path) {
            None => summary.healthy += 1,
            Some(issue) => {
                warn!(file = %path.display(), issue = ?issue.issue, "unhealthy file");
                summary.issues.push(issue);
            }
        }
    }

    info!(total = summary.total, healthy = summary.healthy, "health check finished");
    Ok(summary)
}

/// Inspect a single file; `None` means healthy
pub fn check_file(path: &Path) -> Option<HealthIssue> {
    let issue = |issue, details| {
        Some(HealthIssue {
            file: path.to_path_buf(),
            issue,
            details,
        })
    };

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return issue(HealthIssueKind::Unreadable, HealthDetails::Message(e.to_string())),
    };

    let record: Value = match serde_json::from_slice(&bytes) {
        Ok(record) => record,
        Err(e) => {
            let details = format!("Line {}, Column {}: {}", e.line(), e.column(), e);
            return issue(HealthIssueKind::DecodeError, HealthDetails::Message(details));
        }
    };

    let missing = missing_fields(&record);
    if missing.is_empty() {
        None
    } else {
        issue(HealthIssueKind::MissingFields, HealthDetails::Fields(missing))
    }
}

/// Required fields absent from a record. A non-object misses all of them.
pub fn missing_fields(record: &Value) -> Vec<String> {
    HEALTH_REQUIRED_FIELDS
        .iter()
        .filter(|field| record.get(**field).is_none())
        .map(|field| field.to_string())
        .collect()
}
