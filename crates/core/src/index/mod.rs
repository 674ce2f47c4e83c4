mod directory;

use crate::locator::{Authority, SoundReference};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

pub use directory::DirectoryIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Data,
    Title,
    DisplayName,
}

pub const MEDIA_COLUMNS: [Column; 3] = [Column::Id, Column::Data, Column::Title];
pub const DRM_COLUMNS: [Column; 3] = [Column::Id, Column::Data, Column::Title];

pub fn title_columns(authority: Authority) -> Option<&'static [Column]> {
    match authority {
        Authority::MediaIndex => Some(&MEDIA_COLUMNS),
        Authority::DrmIndex => Some(&DRM_COLUMNS),
        Authority::LocalFile | Authority::SettingsDefault => None,
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("permission denied querying {0}")]
    PermissionDenied(String),

    #[error("index unavailable: {0}")]
    Unavailable(String),
}

/// Result rows of one query. Column positions follow the requested column
/// order.
pub trait Cursor: Send {
    fn count(&self) -> usize;
    fn move_to_first(&mut self) -> bool;
    fn get_string(&self, column: usize) -> Option<String>;
    fn close(&mut self);

    fn get_i64(&self, column: usize) -> Option<i64> {
        self.get_string(column)?.trim().parse().ok()
    }
}

pub trait ContentIndex: Send + Sync {
    fn query(
        &self,
        locator: &SoundReference,
        columns: &[Column],
    ) -> Result<Box<dyn Cursor>, QueryError>;

    /// Internal ringtones whose display name matches; one `Column::Id` per row.
    fn find_internal_ringtone(&self, display_name: &str) -> Result<Box<dyn Cursor>, QueryError>;
}

pub struct CursorGuard {
    inner: Box<dyn Cursor>,
}

impl CursorGuard {
    pub fn new(inner: Box<dyn Cursor>) -> Self {
        Self { inner }
    }
}

impl Deref for CursorGuard {
    type Target = dyn Cursor;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for CursorGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.inner.close();
    }
}

#[derive(Clone, Debug, Default)]
pub struct RowCursor {
    rows: Vec<Vec<Option<String>>>,
    position: Option<usize>,
    closed: bool,
}

impl RowCursor {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            rows,
            position: None,
            closed: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Cursor for RowCursor {
    fn count(&self) -> usize {
        self.rows.len()
    }

    fn move_to_first(&mut self) -> bool {
        if self.closed || self.rows.is_empty() {
            return false;
        }
        self.position = Some(0);
        true
    }

    fn get_string(&self, column: usize) -> Option<String> {
        if self.closed {
            return None;
        }
        self.rows.get(self.position?)?.get(column)?.clone()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

pub fn data_path(
    index: &dyn ContentIndex,
    reference: &SoundReference,
) -> Result<Option<PathBuf>, QueryError> {
    match reference.authority() {
        Authority::LocalFile => Ok(reference.to_file_path()),
        Authority::SettingsDefault => Ok(None),
        Authority::MediaIndex | Authority::DrmIndex => {
            let mut cursor = CursorGuard::new(index.query(reference, &[Column::Data])?);
            if cursor.count() != 1 || !cursor.move_to_first() {
                return Ok(None);
            }
            Ok(cursor.get_string(0).map(PathBuf::from))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeIndex;

    #[test]
    fn row_cursor_reads_first_row() {
        let mut cursor = RowCursor::new(vec![vec![Some("1".into()), None]]);
        assert_eq!(cursor.get_string(0), None);
        assert!(cursor.move_to_first());
        assert_eq!(cursor.get_i64(0), Some(1));
        assert_eq!(cursor.get_string(1), None);
        cursor.close();
        assert!(cursor.is_closed());
        assert_eq!(cursor.get_string(0), None);
    }

    #[test]
    fn data_path_closes_cursor() {
        let index = FakeIndex::default();
        let reference = SoundReference::parse("content://media/external/audio/media/3").unwrap();
        index.add_row(&reference, "3", "/sdcard/Ringtones/chime.ogg", "Chime");

        let path = data_path(&index, &reference).unwrap();
        assert_eq!(path, Some(PathBuf::from("/sdcard/Ringtones/chime.ogg")));
        assert_eq!(index.opened(), 1);
        assert_eq!(index.closed(), 1);
    }

    #[test]
    fn data_path_for_settings_reference_is_none() {
        let index = FakeIndex::default();
        let reference = SoundReference::parse("content://settings/system/ringtone").unwrap();
        assert_eq!(data_path(&index, &reference).unwrap(), None);
        assert_eq!(index.opened(), 0);
    }
}
