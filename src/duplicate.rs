//! Duplicate detection
//!
//! A candidate is matched against the store by a primary key (`doi` when it is
//! a non-empty string, `title` otherwise). Enhanced mode additionally requires
//! the stored record to share a dataset name with the candidate. A candidate
//! that names no datasets matches any stored record under the same key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::Result;
use crate::store::{RecordId, StudyStore};

/// Dataset fields consulted by enhanced mode unless configured otherwise
pub const DEFAULT_DATASET_FIELDS: &[&str] = &["source_dataset", "target_dataset"];

/// Duplicate detection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateMode {
    /// Import everything, never query the store
    Disabled,
    /// Same doi (or title)
    #[default]
    Basic,
    /// Same doi (or title) and an overlapping dataset
    Enhanced,
}

impl DuplicateMode {
    /// Map an answer to the interactive duplicate menu.
    ///
    /// `1` disables detection, `2` selects enhanced mode, anything else falls
    /// back to basic.
    pub fn from_menu_choice(choice: &str) -> Self {
        match choice.trim() {
            "1" => DuplicateMode::Disabled,
            "2" => DuplicateMode::Enhanced,
            _ => DuplicateMode::Basic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateMode::Disabled => "disabled",
            DuplicateMode::Basic => "basic",
            DuplicateMode::Enhanced => "enhanced",
        }
    }
}

impl fmt::Display for DuplicateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicateMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(DuplicateMode::Disabled),
            "basic" => Ok(DuplicateMode::Basic),
            "enhanced" => Ok(DuplicateMode::Enhanced),
            other => Err(format!(
                "unknown duplicate mode '{}' (expected disabled, basic or enhanced)",
                other
            )),
        }
    }
}

/// Field used as the primary duplicate key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyField {
    Doi,
    Title,
}

impl KeyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyField::Doi => "doi",
            KeyField::Title => "title",
        }
    }
}

/// Restriction on the dataset fields of a stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetClause {
    /// Some dataset entry is named one of these
    AnyOf(BTreeSet<String>),
    /// The candidate names no datasets; the key alone decides
    Unnamed,
}

/// Why a candidate was considered a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DuplicateReason {
    #[serde(rename = "doi")]
    Doi,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "doi+dataset")]
    DoiDataset,
    #[serde(rename = "title+dataset")]
    TitleDataset,
}

impl DuplicateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateReason::Doi => "doi",
            DuplicateReason::Title => "title",
            DuplicateReason::DoiDataset => "doi+dataset",
            DuplicateReason::TitleDataset => "title+dataset",
        }
    }
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup filter derived from a candidate record. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateQuery {
    pub key_field: KeyField,
    pub key_value: String,
    pub datasets: Option<DatasetClause>,
    /// Fields whose entries' `name`s make up a record's dataset names
    pub dataset_fields: Vec<String>,
}

impl DuplicateQuery {
    pub fn reason(&self) -> DuplicateReason {
        match (self.key_field, self.datasets.is_some()) {
            (KeyField::Doi, false) => DuplicateReason::Doi,
            (KeyField::Title, false) => DuplicateReason::Title,
            (KeyField::Doi, true) => DuplicateReason::DoiDataset,
            (KeyField::Title, true) => DuplicateReason::TitleDataset,
        }
    }

    /// Whether a stored document satisfies this filter
    pub fn matches(&self, document: &Value) -> bool {
        let key_matches = document
            .get(self.key_field.as_str())
            .and_then(Value::as_str)
            .map_or(false, |v| v == self.key_value);
        if !key_matches {
            return false;
        }

        match &self.datasets {
            None => true,
            Some(DatasetClause::Unnamed) => true,
            Some(DatasetClause::AnyOf(wanted)) => dataset_names(document, &self.dataset_fields)
                .iter()
                .any(|name| wanted.contains(name)),
        }
    }
}

/// A stored record the candidate duplicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatch {
    pub existing_id: RecordId,
    pub reason: DuplicateReason,
    /// The key value the match was made on
    pub value: String,
}

/// Collect the names of every dataset entry under `fields`
pub fn dataset_names(record: &Value, fields: &[String]) -> BTreeSet<String> {
    fields
        .iter()
        .filter_map(|field| record.get(field).and_then(Value::as_array))
        .flatten()
        .filter_map(|entry| entry.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

fn non_empty_str<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Decides whether a candidate already exists in the store
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    dataset_fields: Vec<String>,
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new(DEFAULT_DATASET_FIELDS.iter().map(|s| s.to_string()).collect())
    }
}

impl DuplicateResolver {
    pub fn new(dataset_fields: Vec<String>) -> Self {
        Self { dataset_fields }
    }

    /// Build the lookup filter for a candidate.
    ///
    /// Returns `None` when detection is disabled or the record has neither a
    /// doi nor a title; an empty filter would match every stored record.
    pub fn build_query(&self, record: &Value, mode: DuplicateMode) -> Option<DuplicateQuery> {
        if mode == DuplicateMode::Disabled {
            return None;
        }

        let (key_field, key_value) = match non_empty_str(record, "doi") {
            Some(doi) => (KeyField::Doi, doi),
            None => (KeyField::Title, non_empty_str(record, "title")?),
        };

        let datasets = match mode {
            DuplicateMode::Enhanced => {
                let names = dataset_names(record, &self.dataset_fields);
                if names.is_empty() {
                    Some(DatasetClause::Unnamed)
                } else {
                    Some(DatasetClause::AnyOf(names))
                }
            }
            _ => None,
        };

        Some(DuplicateQuery {
            key_field,
            key_value: key_value.to_string(),
            datasets,
            dataset_fields: self.dataset_fields.clone(),
        })
    }

    /// Look the candidate up in `store` under `mode`
    pub fn is_duplicate<S: StudyStore + ?Sized>(
        &self,
        record: &Value,
        mode: DuplicateMode,
        store: &S,
    ) -> Result<Option<DuplicateMatch>> {
        let Some(query) = self.build_query(record, mode) else {
            return Ok(None);
        };

        debug!(field = query.key_field.as_str(), value = %query.key_value, "duplicate lookup");

        Ok(store.find_one(&query)?.map(|existing| DuplicateMatch {
            existing_id: existing.id,
            reason: query.reason(),
            value: query.key_value.clone(),
        }))
    }
}
