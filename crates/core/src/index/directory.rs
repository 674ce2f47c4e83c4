use crate::index::{Column, ContentIndex, Cursor, QueryError, RowCursor};
use crate::locator::{Authority, MediaVolume, SoundReference};
use std::path::{Path, PathBuf};

const MEDIA_COLLECTION: &str = "media";
const AUDIO_EXTENSIONS: [&str; 7] = ["ogg", "oga", "mp3", "wav", "flac", "m4a", "aac"];

#[derive(Clone, Debug)]
struct Entry {
    id: i64,
    path: PathBuf,
}

impl Entry {
    fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn title(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn cell(&self, column: Column) -> Option<String> {
        match column {
            Column::Id => Some(self.id.to_string()),
            Column::Data => Some(self.path.display().to_string()),
            Column::Title => Some(self.title()),
            Column::DisplayName => Some(self.display_name()),
        }
    }

    fn row(&self, columns: &[Column]) -> Vec<Option<String>> {
        columns.iter().map(|c| self.cell(*c)).collect()
    }
}

/// Media index over sound directories. Files under `internal_dir` are the
/// system ringtones. Ids are 1-based positions in file-name order and are
/// recomputed on every query. There is no DRM store behind this index.
#[derive(Clone, Debug)]
pub struct DirectoryIndex {
    internal_dir: PathBuf,
    external_dir: Option<PathBuf>,
}

impl DirectoryIndex {
    pub fn new<P: Into<PathBuf>>(internal_dir: P) -> Self {
        Self {
            internal_dir: internal_dir.into(),
            external_dir: None,
        }
    }

    pub fn with_external_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.external_dir = Some(dir.into());
        self
    }

    fn dir_for(&self, volume: MediaVolume) -> Option<&Path> {
        match volume {
            MediaVolume::Internal => Some(self.internal_dir.as_path()),
            MediaVolume::External => self.external_dir.as_deref(),
        }
    }

    fn scan(dir: &Path) -> Result<Vec<Entry>, QueryError> {
        let read = std::fs::read_dir(dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                QueryError::PermissionDenied(dir.display().to_string())
            }
            _ => QueryError::Unavailable(format!("{}: {e}", dir.display())),
        })?;

        let mut paths: Vec<PathBuf> = read
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_audio_file(p))
            .collect();
        paths.sort();

        Ok(paths
            .into_iter()
            .zip(1i64..)
            .map(|(path, id)| Entry { id, path })
            .collect())
    }

    fn query_media(
        &self,
        locator: &SoundReference,
        columns: &[Column],
    ) -> Result<RowCursor, QueryError> {
        let Some(dir) = locator.media_volume().and_then(|v| self.dir_for(v)) else {
            return Ok(RowCursor::empty());
        };
        let is_collection = locator.last_path_segment().as_deref() == Some(MEDIA_COLLECTION);
        let id = locator.id();
        if !is_collection && id.is_none() {
            return Ok(RowCursor::empty());
        }
        let entries = Self::scan(dir)?;
        let rows = match id {
            Some(id) => entries
                .iter()
                .filter(|e| e.id == id)
                .map(|e| e.row(columns))
                .collect(),
            None => entries.iter().map(|e| e.row(columns)).collect(),
        };
        Ok(RowCursor::new(rows))
    }

    fn query_file(locator: &SoundReference, columns: &[Column]) -> RowCursor {
        match locator.to_file_path() {
            Some(path) if path.is_file() => {
                let entry = Entry { id: 0, path };
                RowCursor::new(vec![entry.row(columns)])
            }
            _ => RowCursor::empty(),
        }
    }
}

impl ContentIndex for DirectoryIndex {
    fn query(
        &self,
        locator: &SoundReference,
        columns: &[Column],
    ) -> Result<Box<dyn Cursor>, QueryError> {
        let cursor = match locator.authority() {
            Authority::MediaIndex => self.query_media(locator, columns)?,
            Authority::LocalFile => Self::query_file(locator, columns),
            Authority::DrmIndex => {
                return Err(QueryError::PermissionDenied(locator.to_string()));
            }
            Authority::SettingsDefault => RowCursor::empty(),
        };
        Ok(Box::new(cursor))
    }

    fn find_internal_ringtone(&self, display_name: &str) -> Result<Box<dyn Cursor>, QueryError> {
        let rows = Self::scan(&self.internal_dir)?
            .iter()
            .filter(|e| e.display_name() == display_name)
            .map(|e| e.row(&[Column::Id]))
            .collect();
        Ok(Box::new(RowCursor::new(rows)))
    }
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
