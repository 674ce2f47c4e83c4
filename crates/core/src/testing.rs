//! In-memory collaborators that count what they were asked to do.

use crate::assets::{AssetError, AssetFd, AssetStore};
use crate::attributes::{PlaybackAttributes, StreamType};
use crate::config::ResolverConfig;
use crate::index::{Column, ContentIndex, Cursor, QueryError, RowCursor};
use crate::locator::{MediaVolume, SoundReference};
use crate::playback::{EngineError, MediaSource, PlaybackEngine, PlaybackHandle};
use crate::remote::{RemoteSurface, RemoteToken, TransportError};
use crate::session::{Collaborators, PlaybackResolver};
use crate::settings::{SettingsError, SettingsStore};
use crate::volume::VolumeService;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct EngineState {
    fail_open: HashSet<String>,
    fail_prepare: HashSet<String>,
    fail_descriptors: bool,
    opened: usize,
    started: usize,
    stopped: usize,
    released: usize,
    live: usize,
    sources: Vec<String>,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    pub fn fail_open(&self, reference: &SoundReference) {
        lock(&self.state).fail_open.insert(reference.to_string());
    }

    pub fn fail_prepare(&self, reference: &SoundReference) {
        lock(&self.state).fail_prepare.insert(reference.to_string());
    }

    pub fn fail_descriptors(&self, fail: bool) {
        lock(&self.state).fail_descriptors = fail;
    }

    pub fn opened(&self) -> usize {
        lock(&self.state).opened
    }

    pub fn started(&self) -> usize {
        lock(&self.state).started
    }

    pub fn stopped(&self) -> usize {
        lock(&self.state).stopped
    }

    pub fn released(&self) -> usize {
        lock(&self.state).released
    }

    pub fn live_handles(&self) -> usize {
        lock(&self.state).live
    }

    pub fn sources(&self) -> Vec<String> {
        lock(&self.state).sources.clone()
    }
}

impl PlaybackEngine for FakeEngine {
    fn open(
        &self,
        source: MediaSource,
        _attributes: &PlaybackAttributes,
    ) -> Result<Box<dyn PlaybackHandle>, EngineError> {
        let description = source.describe();
        let mut state = lock(&self.state);
        if state.fail_open.contains(&description) {
            return Err(EngineError::PermissionDenied(description));
        }
        let fail_prepare = match source {
            MediaSource::Reference(_) => state.fail_prepare.contains(&description),
            MediaSource::Descriptor { .. } => state.fail_descriptors,
        };
        state.opened += 1;
        state.live += 1;
        state.sources.push(description);
        Ok(Box::new(FakeHandle {
            state: self.state.clone(),
            fail_prepare,
            playing: false,
            released: false,
        }))
    }
}

struct FakeHandle {
    state: Arc<Mutex<EngineState>>,
    fail_prepare: bool,
    playing: bool,
    released: bool,
}

impl PlaybackHandle for FakeHandle {
    fn prepare(&mut self) -> Result<(), EngineError> {
        if self.fail_prepare {
            return Err(EngineError::Io(std::io::Error::other("unsupported format")));
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        if self.released {
            return Err(EngineError::IllegalState("start after release"));
        }
        self.playing = true;
        lock(&self.state).started += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
        lock(&self.state).stopped += 1;
    }

    fn reset(&mut self) {
        self.playing = false;
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.playing = false;
        let mut state = lock(&self.state);
        state.released += 1;
        state.live -= 1;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

#[derive(Clone)]
struct IndexRow {
    id: String,
    data: String,
    title: String,
    display_name: Option<String>,
}

impl IndexRow {
    fn project(&self, columns: &[Column]) -> Vec<Option<String>> {
        columns
            .iter()
            .map(|column| match column {
                Column::Id => Some(self.id.clone()),
                Column::Data => Some(self.data.clone()),
                Column::Title => Some(self.title.clone()),
                Column::DisplayName => self.display_name.clone(),
            })
            .collect()
    }
}

#[derive(Default)]
struct IndexState {
    rows: HashMap<String, Vec<IndexRow>>,
    internal: Vec<IndexRow>,
    denied: HashSet<String>,
    opened: usize,
    closed: usize,
}

#[derive(Default)]
pub struct FakeIndex {
    state: Arc<Mutex<IndexState>>,
}

impl FakeIndex {
    pub fn add_row(&self, reference: &SoundReference, id: &str, data: &str, title: &str) {
        lock(&self.state)
            .rows
            .entry(reference.to_string())
            .or_default()
            .push(IndexRow {
                id: id.to_owned(),
                data: data.to_owned(),
                title: title.to_owned(),
                display_name: None,
            });
    }

    /// Registers a shipped ringtone; it is also queryable under its internal
    /// media reference.
    pub fn add_internal_ringtone(&self, display_name: &str, id: i64) {
        let title = Path::new(display_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| display_name.to_owned());
        let row = IndexRow {
            id: id.to_string(),
            data: format!("/system/media/audio/ringtones/{display_name}"),
            title,
            display_name: Some(display_name.to_owned()),
        };
        let reference = SoundReference::media(MediaVolume::Internal, id);
        let mut state = lock(&self.state);
        state
            .rows
            .entry(reference.to_string())
            .or_default()
            .push(row.clone());
        state.internal.push(row);
    }

    pub fn deny(&self, reference: &SoundReference) {
        lock(&self.state).denied.insert(reference.to_string());
    }

    pub fn opened(&self) -> usize {
        lock(&self.state).opened
    }

    pub fn closed(&self) -> usize {
        lock(&self.state).closed
    }

    fn cursor(&self, rows: Vec<Vec<Option<String>>>) -> Box<dyn Cursor> {
        lock(&self.state).opened += 1;
        Box::new(TrackingCursor {
            inner: RowCursor::new(rows),
            state: self.state.clone(),
        })
    }
}

impl ContentIndex for FakeIndex {
    fn query(
        &self,
        locator: &SoundReference,
        columns: &[Column],
    ) -> Result<Box<dyn Cursor>, QueryError> {
        let key = locator.to_string();
        let rows = {
            let state = lock(&self.state);
            if state.denied.contains(&key) {
                return Err(QueryError::PermissionDenied(key));
            }
            state
                .rows
                .get(&key)
                .map(|rows| rows.iter().map(|r| r.project(columns)).collect())
                .unwrap_or_default()
        };
        Ok(self.cursor(rows))
    }

    fn find_internal_ringtone(&self, display_name: &str) -> Result<Box<dyn Cursor>, QueryError> {
        let rows = lock(&self.state)
            .internal
            .iter()
            .filter(|r| r.display_name.as_deref() == Some(display_name))
            .map(|r| r.project(&[Column::Id]))
            .collect();
        Ok(self.cursor(rows))
    }
}

struct TrackingCursor {
    inner: RowCursor,
    state: Arc<Mutex<IndexState>>,
}

impl Cursor for TrackingCursor {
    fn count(&self) -> usize {
        self.inner.count()
    }

    fn move_to_first(&mut self) -> bool {
        self.inner.move_to_first()
    }

    fn get_string(&self, column: usize) -> Option<String> {
        self.inner.get_string(column)
    }

    fn close(&mut self) {
        if self.inner.is_closed() {
            return;
        }
        self.inner.close();
        lock(&self.state).closed += 1;
    }
}

#[derive(Default)]
pub struct FakeSettings {
    values: Mutex<HashMap<String, String>>,
    reads: Mutex<usize>,
    writes: Mutex<usize>,
}

impl FakeSettings {
    pub fn set(&self, key: &str, value: &str) {
        lock(&self.values).insert(key.to_owned(), value.to_owned());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    pub fn reads(&self) -> usize {
        *lock(&self.reads)
    }

    pub fn writes(&self) -> usize {
        *lock(&self.writes)
    }
}

impl SettingsStore for FakeSettings {
    fn get_string(&self, key: &str) -> Option<String> {
        *lock(&self.reads) += 1;
        self.value(key)
    }

    fn put_string(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        *lock(&self.writes) += 1;
        self.set(key, value);
        Ok(())
    }
}

pub struct FakeVolume {
    default_level: Mutex<u32>,
    levels: Mutex<BTreeMap<StreamType, u32>>,
    queries: Mutex<usize>,
}

impl FakeVolume {
    pub fn new(level: u32) -> Self {
        Self {
            default_level: Mutex::new(level),
            levels: Mutex::new(BTreeMap::new()),
            queries: Mutex::new(0),
        }
    }

    pub fn set(&self, level: u32) {
        *lock(&self.default_level) = level;
    }

    pub fn set_stream(&self, stream: StreamType, level: u32) {
        lock(&self.levels).insert(stream, level);
    }

    pub fn queries(&self) -> usize {
        *lock(&self.queries)
    }
}

impl VolumeService for FakeVolume {
    fn stream_volume(&self, stream: StreamType) -> u32 {
        *lock(&self.queries) += 1;
        lock(&self.levels)
            .get(&stream)
            .copied()
            .unwrap_or_else(|| *lock(&self.default_level))
    }
}

/// Serves this crate's manifest as the bundled sound.
#[derive(Default)]
pub struct FakeAssets {
    opens: Mutex<usize>,
    missing: Mutex<bool>,
}

impl FakeAssets {
    pub fn opens(&self) -> usize {
        *lock(&self.opens)
    }

    pub fn set_missing(&self, missing: bool) {
        *lock(&self.missing) = missing;
    }
}

impl AssetStore for FakeAssets {
    fn open_fallback_asset(&self) -> Result<AssetFd, AssetError> {
        *lock(&self.opens) += 1;
        if *lock(&self.missing) {
            return Err(AssetError::NotFound("fallbackring.ogg".to_owned()));
        }
        let file = File::open(Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"))?;
        let declared_length = Some(file.metadata()?.len());
        Ok(AssetFd {
            file,
            start_offset: 0,
            declared_length,
        })
    }
}

#[derive(Default)]
struct RemoteState {
    failing: bool,
    playing: bool,
    plays: usize,
    stops: usize,
    queries: usize,
    tokens: Vec<RemoteToken>,
    references: Vec<String>,
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<RemoteState>,
}

impl FakeRemote {
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }

    pub fn set_playing(&self, playing: bool) {
        lock(&self.state).playing = playing;
    }

    pub fn plays(&self) -> usize {
        lock(&self.state).plays
    }

    pub fn stops(&self) -> usize {
        lock(&self.state).stops
    }

    pub fn queries(&self) -> usize {
        lock(&self.state).queries
    }

    pub fn calls(&self) -> usize {
        let state = lock(&self.state);
        state.plays + state.stops + state.queries
    }

    pub fn tokens(&self) -> Vec<RemoteToken> {
        lock(&self.state).tokens.clone()
    }

    pub fn played_references(&self) -> Vec<String> {
        lock(&self.state).references.clone()
    }
}

impl RemoteSurface for FakeRemote {
    fn play(
        &self,
        token: RemoteToken,
        reference: &SoundReference,
        _attributes: &PlaybackAttributes,
    ) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.plays += 1;
        state.tokens.push(token);
        if state.failing {
            return Err(TransportError::Disconnected);
        }
        state.references.push(reference.to_string());
        Ok(())
    }

    fn stop(&self, token: RemoteToken) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.stops += 1;
        state.tokens.push(token);
        if state.failing {
            return Err(TransportError::Disconnected);
        }
        state.playing = false;
        Ok(())
    }

    fn is_playing(&self, token: RemoteToken) -> Result<bool, TransportError> {
        let mut state = lock(&self.state);
        state.queries += 1;
        state.tokens.push(token);
        if state.failing {
            return Err(TransportError::Disconnected);
        }
        Ok(state.playing)
    }
}

/// One fake of every collaborator, volume at 5 on all streams.
pub struct Fixture {
    pub engine: Arc<FakeEngine>,
    pub index: Arc<FakeIndex>,
    pub settings: Arc<FakeSettings>,
    pub volume: Arc<FakeVolume>,
    pub assets: Arc<FakeAssets>,
    pub remote: Arc<FakeRemote>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            engine: Arc::new(FakeEngine::default()),
            index: Arc::new(FakeIndex::default()),
            settings: Arc::new(FakeSettings::default()),
            volume: Arc::new(FakeVolume::new(5)),
            assets: Arc::new(FakeAssets::default()),
            remote: Arc::new(FakeRemote::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            engine: self.engine.clone(),
            index: self.index.clone(),
            settings: self.settings.clone(),
            volume: self.volume.clone(),
            assets: self.assets.clone(),
            remote: Some(self.remote.clone() as Arc<dyn RemoteSurface>),
        }
    }

    pub fn resolver(&self) -> PlaybackResolver {
        self.resolver_with(ResolverConfig::default())
    }

    pub fn resolver_with(&self, config: ResolverConfig) -> PlaybackResolver {
        PlaybackResolver::new(self.collaborators(), config)
    }

    /// Every call any collaborator has seen.
    pub fn total_calls(&self) -> usize {
        self.engine.opened()
            + self.index.opened()
            + self.settings.reads()
            + self.settings.writes()
            + self.volume.queries()
            + self.assets.opens()
            + self.remote.calls()
    }
}
