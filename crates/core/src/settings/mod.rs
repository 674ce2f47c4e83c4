mod json;

use crate::locator::{DefaultSoundKind, SoundReference};

pub use json::JsonSettingsStore;

const LOG_TARGET: &str = "settings";

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not a JSON object of strings: {0}")]
    Format(#[from] serde_json::Error),

    #[error("settings store lock poisoned")]
    Poisoned,
}

pub trait SettingsStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn put_string(&self, key: &str, value: &str) -> Result<(), SettingsError>;

    /// Current sound configured for `kind`. Unparsable values count as unset.
    fn default_reference(&self, kind: DefaultSoundKind) -> Option<SoundReference> {
        let raw = self.get_string(kind.setting_key())?;
        match SoundReference::parse(&raw) {
            Ok(reference) => Some(reference),
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    key = kind.setting_key(),
                    error = %e,
                    "ignoring malformed default sound setting"
                );
                None
            }
        }
    }
}
