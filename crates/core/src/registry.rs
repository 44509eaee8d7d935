use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;

use crate::error::RegistryError;
use crate::models::{DocumentRecord, DocumentStatus};

/// Durable table of documents keyed by stored path. Owns the document
/// lifecycle and nothing else: it never touches the filesystem or the
/// vector index.
pub struct DocumentRegistry {
    conn: Mutex<Connection>,
}

impl DocumentRegistry {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let registry = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        registry.migrate()?;
        Ok(registry)
    }

    /// In-memory registry, used by tests and throwaway runs.
    pub fn in_memory() -> Result<Self, RegistryError> {
        let registry = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        registry.migrate()?;
        Ok(registry)
    }

    fn migrate(&self) -> Result<(), RegistryError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                path TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL
                    CHECK(status IN ('uploaded', 'ingested')),
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
            "#,
        )?;
        Ok(())
    }

    /// Registers a document in state `uploaded` and returns its id.
    /// Fails with `DuplicatePath` when the path is already registered;
    /// no row is modified in that case.
    pub fn add(&self, filename: &str, stored_path: &str) -> Result<i64, RegistryError> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO documents (filename, path, status, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                filename,
                stored_path,
                DocumentStatus::Uploaded.as_str(),
                Utc::now()
            ],
        );

        match inserted {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Err(RegistryError::DuplicatePath(stored_path.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Sets the status of the record matching `stored_path`. A missing
    /// row is a no-op: ingestion finishing after a delete must not
    /// resurrect anything.
    pub fn update_status(
        &self,
        stored_path: &str,
        status: DocumentStatus,
    ) -> Result<(), RegistryError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE documents SET status = ?1 WHERE path = ?2",
            params![status.as_str(), stored_path],
        )?;
        Ok(())
    }

    /// All records, newest first by creation time.
    pub fn list(&self) -> Result<Vec<DocumentRecord>, RegistryError> {
        let conn = self.conn.lock();
        let mut statement = conn.prepare(
            "SELECT id, filename, path, status, created_at FROM documents
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows = statement.query_map([], |row| {
            let status_raw: String = row.get(3)?;
            let status = DocumentStatus::parse(&status_raw).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    format!("unknown document status: {status_raw}").into(),
                )
            })?;

            Ok(DocumentRecord {
                id: row.get(0)?,
                filename: row.get(1)?,
                stored_path: row.get(2)?,
                status,
                created_at: row.get(4)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Removes the record matching `stored_path`; no-op when absent.
    pub fn delete(&self, stored_path: &str) -> Result<(), RegistryError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM documents WHERE path = ?1", params![stored_path])?;
        Ok(())
    }
}
