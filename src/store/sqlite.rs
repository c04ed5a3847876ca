use chrono::Utc;
use regex::Regex;
use rusqlite::{params, Connection};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, warn};

use super::{RecordId, StoredStudy, StudyStore};
use crate::duplicate::DuplicateQuery;
use crate::error::{ImportError, Result};

/// SQLite-backed study store.
///
/// Each collection is one table. The full study is kept as JSON text in
/// `body`; `doi` and `title` are copied into indexed columns for lookups.
pub struct SqliteStore {
    conn: Connection,
    collection: String,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the collection table exists
    pub fn open(path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, collection)
    }

    pub fn open_in_memory(collection: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, collection)
    }

    fn with_connection(conn: Connection, collection: &str) -> Result<Self> {
        let ident = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
        if !ident.is_match(collection) {
            return Err(ImportError::InvalidCollection(collection.to_string()));
        }

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {t} (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                doi         TEXT,
                title       TEXT,
                body        TEXT NOT NULL,
                checksum    TEXT NOT NULL,
                imported_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS {t}_doi_idx ON {t}(doi);
            CREATE INDEX IF NOT EXISTS {t}_title_idx ON {t}(title);",
            t = collection
        ))?;

        Ok(Self {
            conn,
            collection: collection.to_string(),
        })
    }

    /// Records whose stored body no longer hashes to the checksum written at
    /// insert time, in id order
    pub fn verify_checksums(&self) -> Result<Vec<RecordId>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, body, checksum FROM {} ORDER BY id", self.collection))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut mismatched = Vec::new();
        for row in rows {
            let (id, body, checksum) = row?;
            if body_checksum(&body) != checksum {
                warn!(id, collection = %self.collection, "checksum mismatch");
                mismatched.push(RecordId(id));
            }
        }
        Ok(mismatched)
    }
}

/// SHA256 of the stored JSON text, hex encoded
fn body_checksum(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}

impl StudyStore for SqliteStore {
    fn find_one(&self, query: &DuplicateQuery) -> Result<Option<StoredStudy>> {
        // The key column is one of two fixed names, never user input.
        let sql = format!(
            "SELECT id, body FROM {} WHERE {} = ?1 ORDER BY id",
            self.collection,
            query.key_field.as_str()
        );
        debug!(sql = %sql, value = %query.key_value, "sqlite lookup");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![query.key_value], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (id, body) = row?;
            let document: Value = serde_json::from_str(&body)?;
            if query.matches(&document) {
                return Ok(Some(StoredStudy {
                    id: RecordId(id),
                    document,
                }));
            }
        }
        Ok(None)
    }

    fn insert_one(&mut self, document: &Value) -> Result<RecordId> {
        let doi = document.get("doi").and_then(Value::as_str);
        let title = document.get("title").and_then(Value::as_str);
        let body = serde_json::to_string(document)?;
        let checksum = body_checksum(&body);

        self.conn.execute(
            &format!(
                "INSERT INTO {} (doi, title, body, checksum, imported_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                self.collection
            ),
            params![doi, title, body, checksum, Utc::now().to_rfc3339()],
        )?;
        Ok(RecordId(self.conn.last_insert_rowid()))
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.collection),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
