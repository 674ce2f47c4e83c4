//! Settings-default references are followed through the settings store at
//! most one hop; the target of a default is never itself followed.

use crate::config::TitleLabels;
use crate::index::{title_columns, ContentIndex, CursorGuard, QueryError};
use crate::locator::{Authority, SoundReference};
use crate::settings::SettingsStore;
use std::sync::Arc;

const LOG_TARGET: &str = "resolve";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Indirection {
    Follow,
    Stop,
}

#[derive(Clone)]
pub struct LocatorResolver {
    index: Arc<dyn ContentIndex>,
    settings: Arc<dyn SettingsStore>,
    labels: TitleLabels,
}

impl LocatorResolver {
    pub fn new(
        index: Arc<dyn ContentIndex>,
        settings: Arc<dyn SettingsStore>,
        labels: TitleLabels,
    ) -> Self {
        Self {
            index,
            settings,
            labels,
        }
    }

    /// The reference playback should actually open. `None` when a default
    /// reference has no configured target.
    pub fn resolve_actual(&self, reference: &SoundReference) -> Option<SoundReference> {
        if reference.authority() != Authority::SettingsDefault {
            return Some(reference.clone());
        }
        let Some(kind) = reference.default_kind() else {
            tracing::debug!(target: LOG_TARGET, %reference, "unrecognized default sound key");
            return None;
        };
        let actual = self.settings.default_reference(kind)?;
        if actual.authority() == Authority::SettingsDefault {
            tracing::warn!(target: LOG_TARGET, %reference, %actual, "default sound points at another default");
            return None;
        }
        Some(actual)
    }

    pub fn resolve_title(
        &self,
        reference: Option<&SoundReference>,
        indirection: Indirection,
    ) -> String {
        reference
            .and_then(|r| self.lookup_title(r, indirection))
            .unwrap_or_else(|| self.labels.unknown().to_owned())
    }

    fn lookup_title(
        &self,
        reference: &SoundReference,
        indirection: Indirection,
    ) -> Option<String> {
        match reference.authority() {
            Authority::SettingsDefault => match indirection {
                Indirection::Stop => None,
                Indirection::Follow => Some(self.default_title(reference)),
            },
            Authority::MediaIndex | Authority::DrmIndex => match self.indexed_title(reference) {
                Ok(Some(title)) => Some(title),
                Ok(None) => reference.last_path_segment(),
                Err(e) => {
                    tracing::debug!(target: LOG_TARGET, %reference, error = %e, "title query refused");
                    reference.last_path_segment()
                }
            },
            Authority::LocalFile => reference.last_path_segment(),
        }
    }

    fn default_title(&self, reference: &SoundReference) -> String {
        match self.resolve_actual(reference) {
            None => self.labels.default_label().to_owned(),
            Some(actual) => {
                let actual_title = self.resolve_title(Some(&actual), Indirection::Stop);
                self.labels.default_with_actual(&actual_title)
            }
        }
    }

    fn indexed_title(&self, reference: &SoundReference) -> Result<Option<String>, QueryError> {
        let Some(columns) = title_columns(reference.authority()) else {
            return Ok(None);
        };
        let mut cursor = CursorGuard::new(self.index.query(reference, columns)?);
        if cursor.count() != 1 || !cursor.move_to_first() {
            return Ok(None);
        }
        let title_column = columns.len() - 1;
        Ok(cursor.get_string(title_column))
    }
}
