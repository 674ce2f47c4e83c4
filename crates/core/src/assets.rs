use std::fs::File;
use std::io;
use std::path::PathBuf;

/// An open bundled asset. Dropping it closes the descriptor.
#[derive(Debug)]
pub struct AssetFd {
    pub file: File,
    pub start_offset: u64,
    /// `None` when the length is unknown and the asset runs to end of file.
    pub declared_length: Option<u64>,
}

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("fallback asset not found: {0}")]
    NotFound(String),

    #[error("fallback asset unreadable: {0}")]
    Io(#[from] io::Error),
}

pub trait AssetStore: Send + Sync {
    fn open_fallback_asset(&self) -> Result<AssetFd, AssetError>;
}

#[derive(Clone, Debug)]
pub struct DirectoryAssetStore {
    dir: PathBuf,
    fallback_name: String,
}

impl DirectoryAssetStore {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, fallback_name: S) -> Self {
        Self {
            dir: dir.into(),
            fallback_name: fallback_name.into(),
        }
    }

    pub fn fallback_path(&self) -> PathBuf {
        self.dir.join(&self.fallback_name)
    }
}

impl AssetStore for DirectoryAssetStore {
    fn open_fallback_asset(&self) -> Result<AssetFd, AssetError> {
        let path = self.fallback_path();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(AssetError::Io(e)),
        };
        let declared_length = file.metadata().ok().map(|m| m.len());
        Ok(AssetFd {
            file,
            start_offset: 0,
            declared_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_asset_reports_not_found() {
        let store = DirectoryAssetStore::new("/nonexistent-ringtone-assets", "fallbackring.ogg");
        let err = store.open_fallback_asset().unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }

    #[test]
    fn opens_asset_with_declared_length() {
        let store = DirectoryAssetStore::new(env!("CARGO_MANIFEST_DIR"), "Cargo.toml");
        let asset = store.open_fallback_asset().unwrap();
        assert_eq!(asset.start_offset, 0);
        assert!(asset.declared_length.unwrap_or(0) > 0);
    }
}
