mod config;
pub mod database;

pub use config::Config;
pub use database::Database;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, DatabaseError};

/// Storage keys for the core's persisted collections.
pub const LEDGER_KEY: &str = "ledger";
pub const HISTORY_KEY: &str = "session_history";
pub const SESSION_KEY: &str = "focus_session";
pub const STEP_STATE_KEY: &str = "step_state";

/// The durable key→blob contract the core depends on. The core never
/// assumes a particular storage engine; [`Database`] is the bundled
/// SQLite implementation.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DatabaseError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), DatabaseError>;
    fn delete(&self, key: &str) -> Result<(), DatabaseError>;

    /// Write a batch of entries. Implementations backed by a
    /// transactional engine must commit all-or-nothing so related blobs
    /// never diverge on disk.
    fn put_many(&self, entries: &[(&str, &[u8])]) -> Result<(), DatabaseError> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

/// Load and decode a JSON blob. A missing key yields `None`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn BlobStore,
    key: &str,
) -> Result<Option<T>, CoreError> {
    match store.get(key)? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes).map_err(|e| {
                DatabaseError::CorruptRecord {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Encode a value to JSON and store it. The value is fully serialized
/// before any write, so a failed put never leaves a partial record.
pub fn save_json<T: Serialize>(
    store: &dyn BlobStore,
    key: &str,
    value: &T,
) -> Result<(), CoreError> {
    let bytes = serde_json::to_vec(value)?;
    store.put(key, &bytes)?;
    Ok(())
}

/// Returns `~/.config/focusmint[-dev]/` based on FOCUSMINT_ENV.
///
/// Set FOCUSMINT_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the config directory cannot be created.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSMINT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusmint-dev")
    } else {
        base_dir.join("focusmint")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
