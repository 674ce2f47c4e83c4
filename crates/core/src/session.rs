use crate::assets::AssetStore;
use crate::attributes::{PlaybackAttributes, StreamType};
use crate::config::ResolverConfig;
use crate::fallback::FallbackLadder;
use crate::index::ContentIndex;
use crate::locator::SoundReference;
use crate::playback::{EngineError, LocalPlayer, MediaSource, PlaybackEngine};
use crate::remote::{RemoteSurface, RemoteToken};
use crate::resolve::{Indirection, LocatorResolver};
use crate::restore::DefaultSoundRestorer;
use crate::settings::SettingsStore;
use crate::volume::VolumeService;
use std::sync::Arc;

const LOG_TARGET: &str = "session";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("invalid legacy stream type {0}")]
    InvalidStreamType(i32),
}

#[derive(thiserror::Error, Debug)]
enum OpenError {
    #[error("no default sound configured for {0}")]
    UnresolvedDefault(SoundReference),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn PlaybackEngine>,
    pub index: Arc<dyn ContentIndex>,
    pub settings: Arc<dyn SettingsStore>,
    pub volume: Arc<dyn VolumeService>,
    pub assets: Arc<dyn AssetStore>,
    pub remote: Option<Arc<dyn RemoteSurface>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unbound,
    LocalBound,
    RemoteBound,
}

enum Backing {
    Unbound,
    Local(LocalPlayer),
    Remote,
}

struct Delegate {
    surface: Arc<dyn RemoteSurface>,
    token: RemoteToken,
}

/// Plays one sound reference, locally when possible and through the remote
/// player or the bundled fallback otherwise.
pub struct PlaybackResolver {
    engine: Arc<dyn PlaybackEngine>,
    volume: Arc<dyn VolumeService>,
    delegate: Option<Delegate>,
    locator: LocatorResolver,
    restorer: DefaultSoundRestorer,
    fallback: FallbackLadder,
    attributes: PlaybackAttributes,
    reference: Option<SoundReference>,
    title: Option<String>,
    backing: Backing,
}

impl PlaybackResolver {
    pub fn new(collaborators: Collaborators, config: ResolverConfig) -> Self {
        let Collaborators {
            engine,
            index,
            settings,
            volume,
            assets,
            remote,
        } = collaborators;

        let locator = LocatorResolver::new(index.clone(), settings.clone(), config.labels);
        let restorer = DefaultSoundRestorer::new(index, settings, config.restore);
        let fallback =
            FallbackLadder::new(engine.clone(), volume.clone(), assets, locator.clone());
        let delegate = remote
            .filter(|_| config.allow_remote)
            .map(|surface| Delegate {
                surface,
                token: RemoteToken::generate(),
            });

        Self {
            engine,
            volume,
            delegate,
            locator,
            restorer,
            fallback,
            attributes: PlaybackAttributes::default(),
            reference: None,
            title: None,
            backing: Backing::Unbound,
        }
    }

    pub fn reference(&self) -> Option<&SoundReference> {
        self.reference.as_ref()
    }

    pub fn set_reference(&mut self, reference: Option<SoundReference>) {
        self.title = None;
        self.reference = reference;
        self.bind();
    }

    pub fn attributes(&self) -> &PlaybackAttributes {
        &self.attributes
    }

    /// Attributes must be applied before a handle is prepared, so the
    /// current reference is reopened. The cached title survives.
    pub fn set_attributes(&mut self, attributes: PlaybackAttributes) {
        self.attributes = attributes;
        self.bind();
    }

    pub fn stream_type(&self) -> StreamType {
        self.attributes.stream_type()
    }

    pub fn set_stream_type(&mut self, stream_type: i32) -> Result<(), ResolverError> {
        let stream =
            StreamType::try_from(stream_type).map_err(ResolverError::InvalidStreamType)?;
        self.set_attributes(PlaybackAttributes::from_legacy_stream(stream));
        Ok(())
    }

    pub fn title(&mut self) -> &str {
        if self.title.is_none() {
            self.title = Some(
                self.locator
                    .resolve_title(self.reference.as_ref(), Indirection::Follow),
            );
        }
        self.title.as_deref().unwrap_or_default()
    }

    pub fn set_title<S: Into<String>>(&mut self, title: S) {
        self.title = Some(title.into());
    }

    pub fn state(&self) -> SessionState {
        match self.backing {
            Backing::Unbound => SessionState::Unbound,
            Backing::Local(_) => SessionState::LocalBound,
            Backing::Remote => SessionState::RemoteBound,
        }
    }

    pub fn allows_remote(&self) -> bool {
        self.delegate.is_some()
    }

    fn bind(&mut self) {
        self.release_backing();

        let Some(reference) = self.reference.clone() else {
            return;
        };

        if self.restorer.is_enabled() {
            self.restorer.restore_missing_defaults();
        }

        match self.open_local(&reference) {
            Ok(player) => {
                tracing::debug!(target: LOG_TARGET, %reference, source = player.source(), "created local player");
                self.backing = Backing::Local(player);
            }
            Err(e) => {
                if self.delegate.is_some() {
                    tracing::debug!(target: LOG_TARGET, %reference, error = %e, "problem opening; delegating to remote player");
                } else {
                    tracing::warn!(target: LOG_TARGET, %reference, error = %e, "local open failed and remote playback not allowed");
                }
            }
        }
    }

    fn open_local(&self, reference: &SoundReference) -> Result<LocalPlayer, OpenError> {
        let actual = self
            .locator
            .resolve_actual(reference)
            .ok_or_else(|| OpenError::UnresolvedDefault(reference.clone()))?;
        let player = LocalPlayer::open_prepared(
            self.engine.as_ref(),
            MediaSource::Reference(actual),
            &self.attributes,
        )?;
        Ok(player)
    }

    fn release_backing(&mut self) {
        match std::mem::replace(&mut self.backing, Backing::Unbound) {
            Backing::Unbound => {}
            Backing::Local(player) => drop(player),
            Backing::Remote => {
                if let Some(delegate) = &self.delegate {
                    if let Err(e) = delegate.surface.stop(delegate.token) {
                        tracing::warn!(target: LOG_TARGET, error = %e, "problem stopping ringtone");
                    }
                }
            }
        }
    }

    pub fn play(&mut self) {
        let volume = self.volume.stream_volume(self.attributes.stream_type());

        if let Backing::Local(player) = &mut self.backing {
            // Silent mode: an opened sound is kept but not started.
            if volume == 0 {
                tracing::debug!(target: LOG_TARGET, stream = ?self.attributes.stream_type(), "stream muted; not playing");
                return;
            }
            if let Err(e) = player.start() {
                tracing::warn!(target: LOG_TARGET, error = %e, "local start failed");
            }
            return;
        }

        if volume == 0 {
            tracing::debug!(target: LOG_TARGET, stream = ?self.attributes.stream_type(), "stream muted; not playing");
            return;
        }

        match self.delegate_play() {
            Some(Ok(())) => {
                self.backing = Backing::Remote;
            }
            Some(Err(e)) => {
                if !self.play_fallback() {
                    tracing::warn!(target: LOG_TARGET, error = %e, "problem playing ringtone");
                }
            }
            None => {
                if !self.play_fallback() {
                    tracing::warn!(target: LOG_TARGET, "neither local nor remote playback available");
                }
            }
        }
    }

    fn delegate_play(&self) -> Option<Result<(), crate::remote::TransportError>> {
        let delegate = self.delegate.as_ref()?;
        let reference = self.reference.as_ref()?;
        let Some(actual) = self.locator.resolve_actual(reference) else {
            tracing::debug!(target: LOG_TARGET, %reference, "no default configured; nothing to delegate");
            return None;
        };
        let canonical = actual.canonical();
        tracing::debug!(target: LOG_TARGET, token = %delegate.token, reference = %canonical, "delegating playback");
        Some(
            delegate
                .surface
                .play(delegate.token, &canonical, &self.attributes),
        )
    }

    pub fn play_fallback(&mut self) -> bool {
        match self
            .fallback
            .play(self.reference.as_ref(), &self.attributes)
        {
            Some(player) => {
                self.release_backing();
                self.backing = Backing::Local(player);
                true
            }
            None => false,
        }
    }

    pub fn stop(&mut self) {
        self.release_backing();
    }

    pub fn is_playing(&self) -> bool {
        if let Backing::Local(player) = &self.backing {
            return player.is_playing();
        }
        match &self.delegate {
            Some(delegate) => delegate
                .surface
                .is_playing(delegate.token)
                .unwrap_or_else(|e| {
                    tracing::warn!(target: LOG_TARGET, error = %e, "problem checking ringtone");
                    false
                }),
            None => {
                tracing::debug!(target: LOG_TARGET, "neither local nor remote playback available");
                false
            }
        }
    }
}
