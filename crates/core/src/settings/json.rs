use crate::settings::{SettingsError, SettingsStore, LOG_TARGET};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// String settings kept in memory. When opened from a path, every write is
/// persisted back to that file as a JSON object.
#[derive(Debug, Default)]
pub struct JsonSettingsStore {
    values: RwLock<BTreeMap<String, String>>,
    path: Option<PathBuf>,
}

impl JsonSettingsStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `path` if it exists; a missing file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(SettingsError::Io(e)),
        };
        tracing::debug!(
            target: LOG_TARGET,
            path = %path.display(),
            entries = values.len(),
            "settings loaded"
        );
        Ok(Self {
            values: RwLock::new(values),
            path: Some(path),
        })
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_owned(), value.to_owned());
        }
        self
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(values)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get_string(&self, key: &str) -> Option<String> {
        let values = match self.values.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        values.get(key).cloned()
    }

    fn put_string(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.write().map_err(|_| SettingsError::Poisoned)?;
        values.insert(key.to_owned(), value.to_owned());
        self.persist(&values)
    }
}
