use crate::infrastructure::error::StorageError;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Synchronous string-keyed storage medium. Mirrors the contract of a
/// browser-local key/value store: flat keys, string values, no
/// transactions.
pub trait StorageMedium: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, Default)]
pub struct InMemoryMedium {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryMedium {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|error| StorageError::Medium(format!("medium lock poisoned: {error}")))
    }
}

impl StorageMedium for InMemoryMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

/// Durable medium backed by a single key/value table. Opens a fresh
/// connection per operation; every write is an upsert.
#[derive(Debug, Clone)]
pub struct SqliteMedium {
    db_path: PathBuf,
}

impl SqliteMedium {
    /// Opens the medium at `db_path`, creating the schema when absent.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let medium = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        let connection = medium.connect()?;
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )?;
        Ok(medium)
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        Connection::open(&self.db_path).map_err(StorageError::from)
    }
}

impl StorageMedium for SqliteMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_entries (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM kv_entries WHERE key = ?1", [key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare("SELECT key FROM kv_entries ORDER BY key ASC")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }
}
