use crate::infrastructure::error::StorageError;
use crate::infrastructure::medium::StorageMedium;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_NAMESPACE: &str = "studydesk";

const ENVELOPE_VERSION: u8 = 1;

/// Wrapper persisted around every stored value. The metadata stays
/// internal: callers only ever see `data` again.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    data: serde_json::Value,
    timestamp: String,
    version: u8,
}

/// Namespaced, versioned view over a [`StorageMedium`]. All persisted
/// values travel inside an [`Envelope`]; a malformed entry degrades to the
/// caller-supplied default instead of surfacing an error.
pub struct Store {
    medium: Arc<dyn StorageMedium>,
    namespace: String,
}

impl Store {
    pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
        Self::with_namespace(medium, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(medium: Arc<dyn StorageMedium>, namespace: &str) -> Self {
        Self {
            medium,
            namespace: namespace.to_string(),
        }
    }

    pub fn medium(&self) -> Arc<dyn StorageMedium> {
        Arc::clone(&self.medium)
    }

    fn qualified(&self, key: &str) -> String {
        format!("{}.{key}", self.namespace)
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let envelope = Envelope {
            data: serde_json::to_value(value)?,
            timestamp: Utc::now().to_rfc3339(),
            version: ENVELOPE_VERSION,
        };
        let raw = serde_json::to_string(&envelope)?;
        self.medium.set_item(&self.qualified(key), &raw)
    }

    /// Returns the stored value for `key`, or `default` on a missing key,
    /// an unreadable entry, or an unsupported envelope version.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) | Err(_) => default,
        }
    }

    /// Like [`Store::load`] but keeps the failure observable so callers
    /// can log what was dropped.
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.medium.get_item(&self.qualified(key))? else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_str(&raw)
            .map_err(|error| StorageError::Corrupt(format!("{key}: {error}")))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(StorageError::Corrupt(format!(
                "{key}: unsupported envelope version {}",
                envelope.version
            )));
        }
        let value = serde_json::from_value(envelope.data)
            .map_err(|error| StorageError::Corrupt(format!("{key}: {error}")))?;
        Ok(Some(value))
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.medium.remove_item(&self.qualified(key))
    }

    /// Keys written by this store, namespace prefix stripped, sorted.
    pub fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        let prefix = format!("{}.", self.namespace);
        let mut keys = self
            .medium
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(ToOwned::to_owned))
            .collect::<Vec<_>>();
        keys.sort();
        Ok(keys)
    }
}
