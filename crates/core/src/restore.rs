use crate::config::RestoreConfig;
use crate::index::{Column, ContentIndex, CursorGuard, QueryError};
use crate::locator::{DefaultSoundKind, MediaVolume, SoundReference};
use crate::settings::{SettingsError, SettingsStore};
use std::sync::Arc;

const LOG_TARGET: &str = "restore";

#[derive(thiserror::Error, Debug)]
pub enum RestoreError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("ringtone row for {0:?} has no id")]
    MissingId(String),
}

/// Points ringtone settings whose sound has disappeared back at the
/// device's shipped default.
#[derive(Clone)]
pub struct DefaultSoundRestorer {
    index: Arc<dyn ContentIndex>,
    settings: Arc<dyn SettingsStore>,
    config: RestoreConfig,
}

impl DefaultSoundRestorer {
    pub fn new(
        index: Arc<dyn ContentIndex>,
        settings: Arc<dyn SettingsStore>,
        config: RestoreConfig,
    ) -> Self {
        Self {
            index,
            settings,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn restore_missing_defaults(&self) -> usize {
        if !self.config.enabled {
            return 0;
        }
        self.config
            .slots
            .kinds()
            .filter(|kind| match self.restore_if_missing(*kind) {
                Ok(restored) => restored,
                Err(e) => {
                    tracing::error!(
                        target: LOG_TARGET,
                        key = kind.setting_key(),
                        error = %e,
                        "default sound restore failed"
                    );
                    false
                }
            })
            .count()
    }

    pub fn restore_if_missing(&self, kind: DefaultSoundKind) -> Result<bool, RestoreError> {
        let key = kind.setting_key();
        let Some(current) = self.settings.get_string(key) else {
            return Ok(false);
        };

        if self.still_exists(&current)? {
            return Ok(false);
        }

        let Some(file_name) = self.config.default_file_name(kind) else {
            tracing::debug!(target: LOG_TARGET, key, "no shipped default to restore");
            return Ok(false);
        };

        let mut cursor = CursorGuard::new(self.index.find_internal_ringtone(file_name)?);
        if cursor.count() == 0 || !cursor.move_to_first() {
            tracing::debug!(target: LOG_TARGET, key, file_name, "shipped default not indexed");
            return Ok(false);
        }
        let id = cursor
            .get_i64(0)
            .ok_or_else(|| RestoreError::MissingId(file_name.to_owned()))?;

        let restored = SoundReference::media(MediaVolume::Internal, id);
        self.settings.put_string(key, restored.as_str())?;
        tracing::info!(
            target: LOG_TARGET,
            key,
            missing = %current,
            restored = %restored,
            "restored default sound"
        );
        Ok(true)
    }

    fn still_exists(&self, raw: &str) -> Result<bool, RestoreError> {
        let reference = match SoundReference::parse(raw) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(target: LOG_TARGET, value = raw, error = %e, "unparsable setting counts as missing");
                return Ok(false);
            }
        };
        let cursor = CursorGuard::new(self.index.query(&reference, &[Column::Title])?);
        Ok(cursor.count() > 0)
    }
}
