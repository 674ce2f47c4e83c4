mod channel;

use crate::attributes::PlaybackAttributes;
use crate::locator::SoundReference;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use channel::{ChannelRemoteSurface, RemotePlayerService};

/// Identity a session presents on every delegated call.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RemoteToken(u64);

impl RemoteToken {
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RemoteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("remote player disconnected")]
    Disconnected,

    #[error("remote call failed: {0}")]
    Remote(String),
}

/// Out-of-process player that sessions delegate to when they cannot open a
/// sound themselves. Calls block until the remote side answers.
pub trait RemoteSurface: Send + Sync {
    fn play(
        &self,
        token: RemoteToken,
        reference: &SoundReference,
        attributes: &PlaybackAttributes,
    ) -> Result<(), TransportError>;

    fn stop(&self, token: RemoteToken) -> Result<(), TransportError>;

    fn is_playing(&self, token: RemoteToken) -> Result<bool, TransportError>;
}
