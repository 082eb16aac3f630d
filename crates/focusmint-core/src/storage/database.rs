//! SQLite-backed key→blob store.
//!
//! The core treats persistence as an opaque durable map; this is the
//! bundled implementation of that contract on rusqlite. The reward
//! event collection, session history and in-flight machine state are
//! each stored as one serialized blob.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, BlobStore};
use crate::error::DatabaseError;

/// SQLite database holding the key→blob table.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/focusmint/focusmint.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .join("focusmint.db");
        Self::open_at(&path)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value BLOB NOT NULL
                );",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }
}

impl BlobStore for Database {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn put_many(&self, entries: &[(&str, &[u8])]) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{RewardEvent, RewardLedger, RewardSource};
    use crate::storage::{load_json, save_json, LEDGER_KEY};
    use chrono::Utc;

    #[test]
    fn put_get_round_trip() {
        let db = Database::open_memory().unwrap();
        assert!(db.get("missing").unwrap().is_none());

        db.put("k", b"v1").unwrap();
        assert_eq!(db.get("k").unwrap().unwrap(), b"v1");

        db.put("k", b"v2").unwrap();
        assert_eq!(db.get("k").unwrap().unwrap(), b"v2");

        db.delete("k").unwrap();
        assert!(db.get("k").unwrap().is_none());
    }

    #[test]
    fn ledger_persists_as_blob() {
        let db = Database::open_memory().unwrap();
        let mut ledger = RewardLedger::new();
        ledger.grant(RewardEvent::new(
            "e1",
            30,
            RewardSource::FocusSession,
            Utc::now(),
        ));
        save_json(&db, LEDGER_KEY, &ledger).unwrap();

        let back: RewardLedger = load_json(&db, LEDGER_KEY).unwrap().unwrap();
        assert_eq!(back.total_earned(), 30);
        assert_eq!(back.events().len(), 1);
    }

    #[test]
    fn corrupt_blob_surfaces_as_error() {
        let db = Database::open_memory().unwrap();
        db.put(LEDGER_KEY, b"not json").unwrap();
        let result: Result<Option<RewardLedger>, _> = load_json(&db, LEDGER_KEY);
        assert!(result.is_err());
    }

    #[test]
    fn put_many_upserts_the_whole_batch() {
        let db = Database::open_memory().unwrap();
        db.put("a", b"old").unwrap();

        db.put_many(&[("a", b"new".as_slice()), ("b", b"two")]).unwrap();
        assert_eq!(db.get("a").unwrap().unwrap(), b"new");
        assert_eq!(db.get("b").unwrap().unwrap(), b"two");
    }

    #[test]
    fn on_disk_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.put("k", b"durable").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get("k").unwrap().unwrap(), b"durable");
    }
}
