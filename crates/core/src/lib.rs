#![deny(warnings)]

pub mod assets;
pub mod attributes;
pub mod config;
pub mod fallback;
pub mod index;
pub mod locator;
pub mod playback;
pub mod remote;
pub mod resolve;
pub mod restore;
pub mod session;
pub mod settings;
pub mod volume;

#[cfg(test)]
mod testing;

pub use attributes::{PlaybackAttributes, StreamType};
pub use locator::{DefaultSoundKind, SoundReference};
pub use session::{Collaborators, PlaybackResolver, ResolverError, SessionState};
