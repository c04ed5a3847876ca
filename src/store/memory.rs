use serde_json::Value;
use std::cell::Cell;

use super::{RecordId, StoredStudy, StudyStore};
use crate::duplicate::DuplicateQuery;
use crate::error::Result;

/// In-memory study store
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Vec<StoredStudy>,
    lookups: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `find_one` has been called
    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl StudyStore for MemoryStore {
    fn find_one(&self, query: &DuplicateQuery) -> Result<Option<StoredStudy>> {
        self.lookups.set(self.lookups.get() + 1);
        Ok(self
            .documents
            .iter()
            .find(|stored| query.matches(&stored.document))
            .cloned())
    }

    fn insert_one(&mut self, document: &Value) -> Result<RecordId> {
        let id = RecordId(self.documents.len() as i64 + 1);
        self.documents.push(StoredStudy {
            id,
            document: document.clone(),
        });
        Ok(id)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.documents.len())
    }
}
