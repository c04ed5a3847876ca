//! Import pipeline
//!
//! For each discovered file: decode, validate, check for duplicates, insert.
//! A failing file is recorded and the run moves on; only a missing root
//! directory aborts a run, and it does so before any file is touched.
//!
//! Duplicate checks see everything inserted earlier in the same run, so two
//! files describing the same study import once.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{DiscoveryConfig, ImportConfig};
use crate::discover::discover_files;
use crate::duplicate::{DuplicateMode, DuplicateResolver};
use crate::error::{ErrorKind, ImportError, Result};
use crate::report::{DuplicateEntry, LoadErrorEntry, ValidationEntry};
use crate::schema::SchemaValidator;
use crate::store::{RecordId, StudyStore};

/// What happened to a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Inserted { file: PathBuf, id: RecordId },
    SkippedDuplicate(DuplicateEntry),
    RejectedInvalid(ValidationEntry),
    LoadError(LoadErrorEntry),
}

impl FileOutcome {
    pub fn file(&self) -> &Path {
        match self {
            FileOutcome::Inserted { file, .. } => file,
            FileOutcome::SkippedDuplicate(entry) => &entry.file,
            FileOutcome::RejectedInvalid(entry) => &entry.file,
            FileOutcome::LoadError(entry) => &entry.file,
        }
    }

    fn load_error(file: &Path, kind: ErrorKind, message: impl Into<String>) -> Self {
        FileOutcome::LoadError(LoadErrorEntry {
            file: file.to_path_buf(),
            error_type: kind,
            error_message: message.into(),
            line: None,
            column: None,
        })
    }
}

/// Counts and outcome details of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub load_errors: usize,
    pub duplicates: Vec<DuplicateEntry>,
    pub validation_failures: Vec<ValidationEntry>,
    pub load_failures: Vec<LoadErrorEntry>,
    /// Every file's outcome in processing order
    pub outcomes: Vec<FileOutcome>,
}

impl RunSummary {
    pub fn total_files(&self) -> usize {
        self.outcomes.len()
    }

    fn record(&mut self, outcome: FileOutcome) {
        match &outcome {
            FileOutcome::Inserted { .. } => self.inserted += 1,
            FileOutcome::SkippedDuplicate(entry) => {
                self.skipped += 1;
                self.duplicates.push(entry.clone());
            }
            FileOutcome::RejectedInvalid(entry) => {
                self.invalid += 1;
                self.validation_failures.push(entry.clone());
            }
            FileOutcome::LoadError(entry) => {
                self.load_errors += 1;
                self.load_failures.push(entry.clone());
            }
        }
        self.outcomes.push(outcome);
    }
}

/// Drives an import run against a store
pub struct Importer<S> {
    validator: SchemaValidator,
    resolver: DuplicateResolver,
    discovery: DiscoveryConfig,
    store: S,
}

impl<S: StudyStore> Importer<S> {
    pub fn new(
        validator: SchemaValidator,
        resolver: DuplicateResolver,
        discovery: DiscoveryConfig,
        store: S,
    ) -> Self {
        Self {
            validator,
            resolver,
            discovery,
            store,
        }
    }

    /// Build an importer from configuration: schema override, dataset
    /// fields and discovery settings.
    pub fn from_config(config: &ImportConfig, store: S) -> Result<Self> {
        let validator = match &config.validation.schema_path {
            Some(path) => SchemaValidator::from_file(path)?,
            None => SchemaValidator::study()?,
        };
        let resolver = DuplicateResolver::new(config.duplicates.dataset_fields.clone());
        Ok(Self::new(validator, resolver, config.discovery.clone(), store))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Import every study file under `root`
    pub fn run(&mut self, root: &Path, mode: DuplicateMode) -> Result<RunSummary> {
        self.run_with(root, mode, |_| {})
    }

    /// Like [`Importer::run`], calling `on_outcome` after each file
    pub fn run_with<F>(&mut self, root: &Path, mode: DuplicateMode, mut on_outcome: F) -> Result<RunSummary>
    where
        F: FnMut(&FileOutcome),
    {
        if !root.is_dir() {
            return Err(ImportError::MissingRoot {
                path: root.to_path_buf(),
            });
        }

        let files = discover_files(root, &self.discovery);
        info!(root = %root.display(), files = files.len(), mode = %mode, "starting import");

        let mut summary = RunSummary::default();
        for path in files {
            let outcome = self.import_file(&path, mode);
            on_outcome(&outcome);
            summary.record(outcome);
        }

        info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            invalid = summary.invalid,
            load_errors = summary.load_errors,
            "import finished"
        );
        Ok(summary)
    }

    /// Run one file through decode, validate, duplicate check and insert
    pub fn import_file(&mut self, path: &Path, mode: DuplicateMode) -> FileOutcome {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "unreadable file");
                return FileOutcome::load_error(path, ErrorKind::Unexpected, e.to_string());
            }
        };

        let record: Value = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "JSON decode error");
                return FileOutcome::LoadError(LoadErrorEntry {
                    file: path.to_path_buf(),
                    error_type: ErrorKind::Decode,
                    error_message: e.to_string(),
                    line: Some(e.line()),
                    column: Some(e.column()),
                });
            }
        };

        if let Err(violation) = self.validator.validate(&record) {
            warn!(file = %path.display(), error = %violation.message, "schema validation failed");
            return FileOutcome::RejectedInvalid(ValidationEntry {
                file: path.to_path_buf(),
                error: violation.message,
                instance_path: violation.instance_path,
            });
        }

        match self.resolver.is_duplicate(&record, mode, &self.store) {
            Ok(Some(found)) => {
                warn!(file = %path.display(), reason = %found.reason, "duplicate found");
                return FileOutcome::SkippedDuplicate(DuplicateEntry {
                    file: path.to_path_buf(),
                    reason: found.reason,
                    value: found.value,
                    existing_id: found.existing_id,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(file = %path.display(), error = %e, "duplicate lookup failed");
                return FileOutcome::load_error(path, ErrorKind::Unexpected, e.to_string());
            }
        }

        match self.store.insert_one(&record) {
            Ok(id) => {
                info!(file = %path.display(), id = %id, "inserted");
                FileOutcome::Inserted {
                    file: path.to_path_buf(),
                    id,
                }
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "insert failed");
                FileOutcome::load_error(path, ErrorKind::Persistence, e.to_string())
            }
        }
    }
}
