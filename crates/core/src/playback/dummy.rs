use crate::attributes::PlaybackAttributes;
use crate::playback::{EngineError, MediaSource, PlaybackEngine, PlaybackHandle, LOG_TARGET};

/// Accepts every source and plays nothing. Used for dry runs and on hosts
/// without an audio device.
#[derive(Clone, Debug, Default)]
pub struct DummyPlaybackEngine;

impl DummyPlaybackEngine {
    pub fn new() -> Self {
        Self
    }
}

impl PlaybackEngine for DummyPlaybackEngine {
    fn open(
        &self,
        source: MediaSource,
        _attributes: &PlaybackAttributes,
    ) -> Result<Box<dyn PlaybackHandle>, EngineError> {
        tracing::debug!(target: LOG_TARGET, source = %source.describe(), "dummy open");
        Ok(Box::new(DummyHandle::default()))
    }
}

#[derive(Default)]
struct DummyHandle {
    playing: bool,
}

impl PlaybackHandle for DummyHandle {
    fn prepare(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn reset(&mut self) {
        self.playing = false;
    }

    fn release(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::SoundReference;
    use crate::playback::LocalPlayer;

    #[test]
    fn reports_playing_between_start_and_drop() {
        let reference = SoundReference::parse("file:///sounds/a.ogg").unwrap();
        let mut player = LocalPlayer::open_prepared(
            &DummyPlaybackEngine::new(),
            MediaSource::Reference(reference),
            &PlaybackAttributes::default(),
        )
        .unwrap();
        assert!(!player.is_playing());
        player.start().unwrap();
        assert!(player.is_playing());
    }
}
