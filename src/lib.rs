//! Study Import
//!
//! Batch importer for JSON research-study records. Each file found under a
//! root directory is decoded, validated against the study schema, checked
//! against previously imported studies and stored.
//!
//! ## Pipeline
//!
//! ```text
//! discover ─► decode ─► validate ─► duplicate check ─► insert
//!               │           │             │               │
//!               ▼           ▼             ▼               ▼
//!          load_error   validation    duplicate      load_error
//!            report       report        report      (persistence)
//! ```
//!
//! A separate health check ([`health::scan`]) only decodes files and looks
//! for required fields; it never touches a store.

pub mod config;
pub mod discover;
pub mod duplicate;
pub mod error;
pub mod health;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod schema;
pub mod store;

pub use config::ImportConfig;
pub use duplicate::{DuplicateMatch, DuplicateMode, DuplicateReason, DuplicateResolver};
pub use error::{ErrorKind, ImportError, Result};
pub use health::{HealthSummary, scan};
pub use pipeline::{FileOutcome, Importer, RunSummary};
pub use report::ReportWriter;
pub use schema::{SchemaValidator, SchemaViolation};
pub use store::{MemoryStore, RecordId, SqliteStore, StudyStore};
