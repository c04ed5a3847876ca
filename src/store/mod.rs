//! Backing store for imported studies
//!
//! The importer only needs a point lookup and an insert. Anything offering
//! those two operations can back an import run:
//!
//! - [`SqliteStore`]: a SQLite table holding each study as a JSON document
//! - [`MemoryStore`]: an in-process vector, used by tests and dry runs
//!
//! Duplicate check and insert are two separate calls. Two importers running
//! against the same store at once can both insert the same study; no
//! uniqueness constraint is placed on the key columns.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::duplicate::DuplicateQuery;
use crate::error::Result;

/// Identity of a stored study
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A study as returned by a lookup
#[derive(Debug, Clone, PartialEq)]
pub struct StoredStudy {
    pub id: RecordId,
    pub document: Value,
}

/// Lookup and insert capability required by the importer
pub trait StudyStore {
    /// First stored study satisfying `query`, if any
    fn find_one(&self, query: &DuplicateQuery) -> Result<Option<StoredStudy>>;

    /// Persist a new study and return its identity
    fn insert_one(&mut self, document: &Value) -> Result<RecordId>;

    /// Number of stored studies
    fn count(&self) -> Result<usize>;
}
