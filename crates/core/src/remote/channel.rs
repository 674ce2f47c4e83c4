use crate::attributes::PlaybackAttributes;
use crate::locator::SoundReference;
use crate::playback::{LocalPlayer, MediaSource, PlaybackEngine};
use crate::remote::{RemoteSurface, RemoteToken, TransportError};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

const LOG_TARGET: &str = "remote";
const REQUEST_QUEUE_DEPTH: usize = 16;

enum Request {
    Play {
        token: RemoteToken,
        reference: SoundReference,
        attributes: PlaybackAttributes,
        reply: oneshot::Sender<()>,
    },
    Stop {
        token: RemoteToken,
        reply: oneshot::Sender<()>,
    },
    IsPlaying {
        token: RemoteToken,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Delegate player running on its own thread. Holds at most one handle per
/// client token; a new play for a token replaces the previous sound.
pub struct RemotePlayerService {
    tx: mpsc::Sender<Request>,
    worker: Option<JoinHandle<()>>,
}

impl RemotePlayerService {
    pub fn spawn(
        engine: Arc<dyn PlaybackEngine>,
    ) -> std::io::Result<(Self, ChannelRemoteSurface)> {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let worker = std::thread::Builder::new()
            .name("remote-player".to_owned())
            .spawn(move || serve(engine, rx))?;
        let surface = ChannelRemoteSurface { tx: tx.clone() };
        Ok((
            Self {
                tx,
                worker: Some(worker),
            },
            surface,
        ))
    }

    /// Stops every delegated sound and waits for the worker to exit.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if self.tx.blocking_send(Request::Shutdown).is_ok() && worker.join().is_err() {
            tracing::error!(target: LOG_TARGET, "remote player worker panicked");
        }
    }
}

impl Drop for RemotePlayerService {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn serve(engine: Arc<dyn PlaybackEngine>, mut rx: mpsc::Receiver<Request>) {
    let mut players: HashMap<RemoteToken, LocalPlayer> = HashMap::new();
    tracing::debug!(target: LOG_TARGET, "remote player started");

    while let Some(request) = rx.blocking_recv() {
        match request {
            Request::Play {
                token,
                reference,
                attributes,
                reply,
            } => {
                players.remove(&token);
                match LocalPlayer::open_prepared(
                    engine.as_ref(),
                    MediaSource::Reference(reference.clone()),
                    &attributes,
                ) {
                    Ok(mut player) => match player.start() {
                        Ok(()) => {
                            tracing::debug!(target: LOG_TARGET, %token, %reference, "delegated playback started");
                            players.insert(token, player);
                        }
                        Err(e) => {
                            tracing::warn!(target: LOG_TARGET, %token, %reference, error = %e, "delegated start failed");
                        }
                    },
                    Err(e) => {
                        tracing::warn!(target: LOG_TARGET, %token, %reference, error = %e, "delegated open failed");
                    }
                }
                let _ = reply.send(());
            }
            Request::Stop { token, reply } => {
                players.remove(&token);
                let _ = reply.send(());
            }
            Request::IsPlaying { token, reply } => {
                let playing = players.get(&token).is_some_and(|p| p.is_playing());
                let _ = reply.send(playing);
            }
            Request::Shutdown => break,
        }
    }

    tracing::debug!(target: LOG_TARGET, live = players.len(), "remote player stopping");
}

/// Client side of [`RemotePlayerService`].
#[derive(Clone)]
pub struct ChannelRemoteSurface {
    tx: mpsc::Sender<Request>,
}

impl ChannelRemoteSurface {
    fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, TransportError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .blocking_send(build(reply_tx))
            .map_err(|_| TransportError::Disconnected)?;
        reply_rx
            .blocking_recv()
            .map_err(|_| TransportError::Disconnected)
    }
}

impl RemoteSurface for ChannelRemoteSurface {
    fn play(
        &self,
        token: RemoteToken,
        reference: &SoundReference,
        attributes: &PlaybackAttributes,
    ) -> Result<(), TransportError> {
        self.call(|reply| Request::Play {
            token,
            reference: reference.clone(),
            attributes: *attributes,
            reply,
        })
    }

    fn stop(&self, token: RemoteToken) -> Result<(), TransportError> {
        self.call(|reply| Request::Stop { token, reply })
    }

    fn is_playing(&self, token: RemoteToken) -> Result<bool, TransportError> {
        self.call(|reply| Request::IsPlaying { token, reply })
    }
}
