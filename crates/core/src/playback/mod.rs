mod audio;
mod dummy;

use crate::attributes::PlaybackAttributes;
use crate::locator::SoundReference;
use std::fs::File;

pub use audio::RodioPlaybackEngine;
pub use dummy::DummyPlaybackEngine;

#[cfg(feature = "playback-device-enum")]
pub use audio::enumerate_output_device_names;

const LOG_TARGET: &str = "playback";

#[derive(Debug)]
pub enum MediaSource {
    /// A resolved locator. Never a settings-default reference.
    Reference(SoundReference),
    /// A duplicated descriptor; `length: None` reads to end of file.
    Descriptor {
        file: File,
        offset: u64,
        length: Option<u64>,
    },
}

impl MediaSource {
    pub fn describe(&self) -> String {
        match self {
            MediaSource::Reference(r) => r.to_string(),
            MediaSource::Descriptor { offset, length, .. } => match length {
                Some(len) => format!("<descriptor offset={offset} length={len}>"),
                None => format!("<descriptor offset={offset}>"),
            },
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("permission denied opening {0}")]
    PermissionDenied(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no playable data for {0}")]
    NoData(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("audio output unavailable: {details}")]
    AudioOutputUnavailable { details: String },

    #[error("handle used in wrong state: {0}")]
    IllegalState(&'static str),
}

pub trait PlaybackHandle: Send {
    fn prepare(&mut self) -> Result<(), EngineError>;
    fn start(&mut self) -> Result<(), EngineError>;
    fn stop(&mut self);
    fn reset(&mut self);
    fn release(&mut self);
    fn is_playing(&self) -> bool;
}

/// Creates handles with the data source set and attributes applied.
pub trait PlaybackEngine: Send + Sync {
    fn open(
        &self,
        source: MediaSource,
        attributes: &PlaybackAttributes,
    ) -> Result<Box<dyn PlaybackHandle>, EngineError>;
}

/// Exclusive owner of one engine handle. Stop, reset and release happen
/// exactly once, on drop.
pub struct LocalPlayer {
    handle: Box<dyn PlaybackHandle>,
    source: String,
}

impl LocalPlayer {
    /// Opens and prepares `source`. A handle that fails to prepare is
    /// released before the error is returned.
    pub fn open_prepared(
        engine: &dyn PlaybackEngine,
        source: MediaSource,
        attributes: &PlaybackAttributes,
    ) -> Result<Self, EngineError> {
        let description = source.describe();
        let handle = engine.open(source, attributes)?;
        let mut player = Self {
            handle,
            source: description,
        };
        player.handle.prepare()?;
        Ok(player)
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        self.handle.start()
    }

    pub fn is_playing(&self) -> bool {
        self.handle.is_playing()
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Drop for LocalPlayer {
    fn drop(&mut self) {
        self.handle.stop();
        self.handle.reset();
        self.handle.release();
        tracing::debug!(target: LOG_TARGET, source = %self.source, "released local player");
    }
}

impl std::fmt::Debug for LocalPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalPlayer")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
