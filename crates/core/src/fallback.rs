use crate::assets::{AssetError, AssetStore};
use crate::attributes::PlaybackAttributes;
use crate::locator::SoundReference;
use crate::playback::{EngineError, LocalPlayer, MediaSource, PlaybackEngine};
use crate::resolve::LocatorResolver;
use crate::volume::VolumeService;
use std::sync::Arc;

const LOG_TARGET: &str = "fallback";

#[derive(thiserror::Error, Debug)]
pub enum FallbackError {
    #[error("stream volume is zero")]
    Silent,

    #[error("not a default ringtone with a configured target")]
    NotADefaultRingtone,

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("fallback playback failed: {0}")]
    Engine(#[from] EngineError),
}

/// Last rung of playback: the bundled ringtone, used only in place of a
/// default ringtone that could not be played.
#[derive(Clone)]
pub struct FallbackLadder {
    engine: Arc<dyn PlaybackEngine>,
    volume: Arc<dyn VolumeService>,
    assets: Arc<dyn AssetStore>,
    locator: LocatorResolver,
}

impl FallbackLadder {
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        volume: Arc<dyn VolumeService>,
        assets: Arc<dyn AssetStore>,
        locator: LocatorResolver,
    ) -> Self {
        Self {
            engine,
            volume,
            assets,
            locator,
        }
    }

    pub fn play(
        &self,
        reference: Option<&SoundReference>,
        attributes: &PlaybackAttributes,
    ) -> Option<LocalPlayer> {
        match self.try_play(reference, attributes) {
            Ok(player) => {
                tracing::info!(target: LOG_TARGET, "playing fallback ringtone");
                Some(player)
            }
            Err(FallbackError::Silent) => None,
            Err(FallbackError::NotADefaultRingtone) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    reference = %reference.map(ToString::to_string).unwrap_or_default(),
                    "not playing fallback"
                );
                None
            }
            Err(e) => {
                tracing::error!(target: LOG_TARGET, error = %e, "could not play fallback ringtone");
                None
            }
        }
    }

    pub fn try_play(
        &self,
        reference: Option<&SoundReference>,
        attributes: &PlaybackAttributes,
    ) -> Result<LocalPlayer, FallbackError> {
        if self.volume.stream_volume(attributes.stream_type()) == 0 {
            return Err(FallbackError::Silent);
        }
        if !self.replaces_default_ringtone(reference) {
            return Err(FallbackError::NotADefaultRingtone);
        }

        let asset = self.assets.open_fallback_asset()?;
        let source = MediaSource::Descriptor {
            file: asset.file.try_clone().map_err(AssetError::Io)?,
            offset: asset.start_offset,
            length: asset.declared_length,
        };
        let mut player = LocalPlayer::open_prepared(self.engine.as_ref(), source, attributes)?;
        player.start()?;
        drop(asset);
        Ok(player)
    }

    fn replaces_default_ringtone(&self, reference: Option<&SoundReference>) -> bool {
        let Some(reference) = reference else {
            return false;
        };
        let is_ringtone = reference
            .default_kind()
            .is_some_and(|kind| kind.is_ringtone());
        is_ringtone && self.locator.resolve_actual(reference).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TitleLabels;
    use crate::locator::DefaultSoundKind;
    use crate::testing::{FakeAssets, FakeEngine, FakeIndex, FakeSettings, FakeVolume};

    struct Setup {
        engine: Arc<FakeEngine>,
        volume: Arc<FakeVolume>,
        assets: Arc<FakeAssets>,
        settings: Arc<FakeSettings>,
        ladder: FallbackLadder,
    }

    fn setup() -> Setup {
        let engine = Arc::new(FakeEngine::default());
        let volume = Arc::new(FakeVolume::new(5));
        let assets = Arc::new(FakeAssets::default());
        let settings = Arc::new(FakeSettings::default());
        let locator = LocatorResolver::new(
            Arc::new(FakeIndex::default()),
            settings.clone(),
            TitleLabels::default(),
        );
        let ladder = FallbackLadder::new(engine.clone(), volume.clone(), assets.clone(), locator);
        Setup {
            engine,
            volume,
            assets,
            settings,
            ladder,
        }
    }

    fn default_ringtone() -> SoundReference {
        SoundReference::settings_default(DefaultSoundKind::Ringtone { slot: 0 })
    }

    #[test]
    fn plays_bundled_asset_for_configured_default_ringtone() {
        let s = setup();
        s.settings.set("ringtone", "content://media/internal/audio/media/1");

        let player = s
            .ladder
            .play(Some(&default_ringtone()), &PlaybackAttributes::default())
            .unwrap();
        assert!(player.is_playing());
        assert!(player.source().starts_with("<descriptor offset=0"));
        assert_eq!(s.assets.opens(), 1);
        assert_eq!(s.engine.live_handles(), 1);

        drop(player);
        assert_eq!(s.engine.live_handles(), 0);
    }

    #[test]
    fn refuses_unconfigured_default() {
        let s = setup();
        assert!(s
            .ladder
            .play(Some(&default_ringtone()), &PlaybackAttributes::default())
            .is_none());
        assert_eq!(s.assets.opens(), 0);
    }

    #[test]
    fn refuses_custom_sounds_and_other_default_kinds() {
        let s = setup();
        s.settings.set("notification_sound", "content://media/internal/audio/media/2");
        let custom = SoundReference::parse("content://media/external/audio/media/8").unwrap();
        let notification = SoundReference::settings_default(DefaultSoundKind::Notification);

        for reference in [Some(&custom), Some(&notification), None] {
            assert!(matches!(
                s.ladder.try_play(reference, &PlaybackAttributes::default()),
                Err(FallbackError::NotADefaultRingtone)
            ));
        }
        assert_eq!(s.assets.opens(), 0);
    }

    #[test]
    fn silent_stream_suppresses_fallback() {
        let s = setup();
        s.settings.set("ringtone", "content://media/internal/audio/media/1");
        s.volume.set(0);
        assert!(matches!(
            s.ladder
                .try_play(Some(&default_ringtone()), &PlaybackAttributes::default()),
            Err(FallbackError::Silent)
        ));
        assert_eq!(s.assets.opens(), 0);
    }

    #[test]
    fn missing_asset_returns_none() {
        let s = setup();
        s.settings.set("ringtone", "content://media/internal/audio/media/1");
        s.assets.set_missing(true);
        assert!(matches!(
            s.ladder
                .try_play(Some(&default_ringtone()), &PlaybackAttributes::default()),
            Err(FallbackError::Asset(AssetError::NotFound(_)))
        ));
        assert_eq!(s.engine.opened(), 0);
    }

    #[test]
    fn engine_failure_releases_half_built_handle() {
        let s = setup();
        s.settings.set("ringtone", "content://media/internal/audio/media/1");
        s.engine.fail_descriptors(true);
        assert!(s
            .ladder
            .play(Some(&default_ringtone()), &PlaybackAttributes::default())
            .is_none());
        assert_eq!(s.engine.opened(), 1);
        assert_eq!(s.engine.live_handles(), 0);
    }
}
