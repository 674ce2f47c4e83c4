use crate::attributes::PlaybackAttributes;
use crate::index::{self, ContentIndex, QueryError};
use crate::playback::{EngineError, MediaSource, PlaybackEngine, PlaybackHandle, LOG_TARGET};
use rodio::cpal::traits::DeviceTrait;
use rodio::cpal::traits::HostTrait;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, StreamError};
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// A minimal, poison-tolerant, lazy initializer for a single value.
///
/// [`rodio::OutputStream`] must outlive every sink connected to it, so one
/// stream is opened on first use and shared by all handles of an engine.
struct LazyInit<T> {
    value: Mutex<Option<T>>,
}

impl<T> LazyInit<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    fn get_or_try_init_with<R, E>(
        &self,
        init: impl FnOnce() -> Result<T, E>,
        f: impl FnOnce(&T) -> R,
        invariant_err: impl FnOnce() -> E,
    ) -> Result<R, E> {
        let mut guard = match self.value.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    "output stream cache lock was poisoned; recovering and continuing"
                );
                poisoned.into_inner()
            }
        };

        if guard.is_none() {
            *guard = Some(init()?);
        }

        match guard.as_ref() {
            Some(v) => Ok(f(v)),
            None => Err(invariant_err()),
        }
    }
}

struct RateLimitedWarn {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimitedWarn {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    fn should_log(&self) -> bool {
        let mut guard = match self.last.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        let now = Instant::now();
        match *guard {
            None => {
                *guard = Some(now);
                true
            }
            Some(prev) if now.duration_since(prev) >= self.interval => {
                *guard = Some(now);
                true
            }
            Some(_) => false,
        }
    }
}

/// Output device state shared by an engine and every handle it created.
struct Output {
    device_name: Option<String>,
    disabled: AtomicBool,
    disabled_details: OnceLock<String>,
    stream: LazyInit<OutputStream>,
    open_attempts: AtomicUsize,
    unavailable_warn: RateLimitedWarn,
}

impl Output {
    fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            disabled: AtomicBool::new(false),
            disabled_details: OnceLock::new(),
            stream: LazyInit::new(),
            open_attempts: AtomicUsize::new(0),
            unavailable_warn: RateLimitedWarn::new(Duration::from_secs(5)),
        }
    }

    fn open_stream(&self) -> Result<OutputStream, EngineError> {
        let attempt = self.open_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(
            target: LOG_TARGET,
            attempt,
            configured_output_device = %self.device_name.as_deref().unwrap_or("<default>"),
            "opening output stream"
        );

        match self.device_name.as_deref() {
            Some(wanted) => match open_named_output_stream(wanted) {
                Ok(stream) => Ok(stream),
                Err(NamedDeviceStreamError::DeviceNotFound { wanted, available }) => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        wanted_device = %wanted,
                        available_devices = %format_device_list(&available),
                        "configured output device not found; falling back to default output device"
                    );
                    open_default_stream(
                        Some(wanted.as_str()),
                        "default-device fallback after named device not found",
                    )
                }
                Err(NamedDeviceStreamError::OpenFailed {
                    wanted,
                    error,
                    available,
                }) => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        wanted_device = %wanted,
                        error = %error,
                        available_devices = %format_device_list(&available),
                        "failed to open configured output device; falling back to default output device"
                    );
                    open_default_stream(
                        Some(wanted.as_str()),
                        "default-device fallback after named device open failed",
                    )
                }
            },
            None => open_default_stream(None, "open default output stream"),
        }
    }

    /// A paused sink on the shared stream. A missing output device disables
    /// the engine for the rest of its life.
    fn connect_sink(&self) -> Result<Sink, EngineError> {
        if self.disabled.load(Ordering::Relaxed) {
            let details = self
                .disabled_details
                .get()
                .cloned()
                .unwrap_or_else(|| "audio output disabled".to_owned());
            if self.unavailable_warn.should_log() {
                tracing::warn!(target: LOG_TARGET, %details, "audio output unavailable (rate-limited)");
            }
            return Err(EngineError::AudioOutputUnavailable { details });
        }

        let result = self.stream.get_or_try_init_with(
            || self.open_stream(),
            |stream| {
                let sink = Sink::connect_new(stream.mixer());
                sink.pause();
                sink
            },
            || EngineError::AudioOutputUnavailable {
                details: "internal error: output stream cache invariant violated".to_owned(),
            },
        );

        if let Err(EngineError::AudioOutputUnavailable { details }) = &result {
            if details.contains("NoDevice") {
                self.disabled.store(true, Ordering::Relaxed);
                let _ = self.disabled_details.set(details.clone());
            }
        }
        result
    }
}

/// Plays references and descriptors through the default (or a named)
/// output device.
#[derive(Clone)]
pub struct RodioPlaybackEngine {
    index: Arc<dyn ContentIndex>,
    output: Arc<Output>,
}

impl RodioPlaybackEngine {
    /// Indexed references are mapped to files through `index`.
    pub fn new(index: Arc<dyn ContentIndex>) -> Self {
        Self {
            index,
            output: Arc::new(Output::new(None)),
        }
    }

    /// Must be called before the first handle is opened.
    pub fn with_output_device_name<S: Into<String>>(mut self, name: S) -> Self {
        self.output = Arc::new(Output::new(Some(name.into())));
        self
    }

    fn open_reference_file(&self, source: &MediaSource) -> Result<PendingData, EngineError> {
        match source {
            MediaSource::Reference(reference) => {
                let path = index::data_path(self.index.as_ref(), reference)
                    .map_err(|e| match e {
                        QueryError::PermissionDenied(what) => EngineError::PermissionDenied(what),
                        QueryError::Unavailable(what) => EngineError::NoData(what),
                    })?
                    .ok_or_else(|| EngineError::NoData(reference.to_string()))?;
                let file = File::open(&path).map_err(|e| match e.kind() {
                    io::ErrorKind::PermissionDenied => {
                        EngineError::PermissionDenied(path.display().to_string())
                    }
                    _ => EngineError::Io(e),
                })?;
                Ok(PendingData::File(BufReader::new(file)))
            }
            MediaSource::Descriptor {
                file,
                offset,
                length,
            } => {
                let mut file = file.try_clone()?;
                file.seek(SeekFrom::Start(*offset))?;
                let mut bytes = Vec::new();
                match length {
                    Some(len) => file.take(*len).read_to_end(&mut bytes)?,
                    None => file.read_to_end(&mut bytes)?,
                };
                if bytes.is_empty() {
                    return Err(EngineError::NoData(source.describe()));
                }
                Ok(PendingData::Bytes(Cursor::new(bytes)))
            }
        }
    }
}

impl PlaybackEngine for RodioPlaybackEngine {
    fn open(
        &self,
        source: MediaSource,
        attributes: &PlaybackAttributes,
    ) -> Result<Box<dyn PlaybackHandle>, EngineError> {
        let data = self.open_reference_file(&source)?;
        tracing::debug!(
            target: LOG_TARGET,
            source = %source.describe(),
            usage = ?attributes.usage,
            stream = ?attributes.stream_type(),
            "opened data source"
        );
        Ok(Box::new(RodioHandle {
            output: self.output.clone(),
            data: Some(data),
            sink: None,
            released: false,
        }))
    }
}

enum PendingData {
    File(BufReader<File>),
    Bytes(Cursor<Vec<u8>>),
}

struct RodioHandle {
    output: Arc<Output>,
    data: Option<PendingData>,
    sink: Option<Sink>,
    released: bool,
}

fn append_decoded<R>(sink: &Sink, reader: R) -> Result<(), EngineError>
where
    R: Read + Seek + Send + Sync + 'static,
{
    let decoder = Decoder::new(reader).map_err(|e| EngineError::Decode(e.to_string()))?;
    sink.append(decoder);
    Ok(())
}

impl PlaybackHandle for RodioHandle {
    fn prepare(&mut self) -> Result<(), EngineError> {
        if self.released {
            return Err(EngineError::IllegalState("prepare after release"));
        }
        let data = self
            .data
            .take()
            .ok_or(EngineError::IllegalState("prepare called twice"))?;
        let sink = self.output.connect_sink()?;
        match data {
            PendingData::File(reader) => append_decoded(&sink, reader)?,
            PendingData::Bytes(reader) => append_decoded(&sink, reader)?,
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        match &self.sink {
            Some(sink) => {
                sink.play();
                Ok(())
            }
            None => Err(EngineError::IllegalState("start before prepare")),
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn reset(&mut self) {
        if let Some(sink) = &self.sink {
            sink.clear();
        }
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.data = None;
        self.released = true;
    }

    fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .is_some_and(|sink| !sink.is_paused() && !sink.empty())
    }
}

#[derive(Debug)]
enum NamedDeviceStreamError {
    DeviceNotFound {
        wanted: String,
        available: Vec<String>,
    },
    OpenFailed {
        wanted: String,
        error: StreamError,
        available: Vec<String>,
    },
}

fn normalize_device_name(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

fn open_default_stream(wanted: Option<&str>, context: &str) -> Result<OutputStream, EngineError> {
    OutputStreamBuilder::open_default_stream().map_err(|e| EngineError::AudioOutputUnavailable {
        details: format_stream_error_details(e, wanted, context),
    })
}

fn open_named_output_stream(wanted: &str) -> Result<OutputStream, NamedDeviceStreamError> {
    let wanted_norm = normalize_device_name(wanted);

    let host = rodio::cpal::default_host();
    let devices = host.output_devices().ok();
    let mut available: Vec<String> = Vec::new();
    let mut selected = None;

    if let Some(devices) = devices {
        for d in devices {
            let name = d.name().unwrap_or_else(|_| "<unnamed>".to_owned());
            if normalize_device_name(&name) == wanted_norm {
                selected = Some(d);
            }
            available.push(name);
        }
    }

    let Some(device) = selected else {
        return Err(NamedDeviceStreamError::DeviceNotFound {
            wanted: wanted.to_owned(),
            available,
        });
    };

    OutputStreamBuilder::from_device(device)
        .and_then(|b| b.open_stream_or_fallback())
        .map_err(|error| NamedDeviceStreamError::OpenFailed {
            wanted: wanted.to_owned(),
            error,
            available,
        })
}

fn format_device_list(devices: &[String]) -> String {
    if devices.is_empty() {
        return "<unknown>".to_owned();
    }
    devices.join(", ")
}

fn format_stream_error_details(err: StreamError, wanted: Option<&str>, context: &str) -> String {
    let mut s = format!("{context}: {err}");
    if let Some(w) = wanted {
        s.push_str(&format!(" (configured_device={w})"));
    }
    #[cfg(feature = "playback-device-enum")]
    {
        if let Ok(devices) = enumerate_output_device_names() {
            if devices.is_empty() {
                s.push_str("; available_output_devices=<none>");
            } else {
                s.push_str("; available_output_devices=");
                s.push_str(&devices.join(", "));
            }
        }
    }
    s
}

#[cfg(feature = "playback-device-enum")]
pub fn enumerate_output_device_names() -> Result<Vec<String>, EngineError> {
    let host = rodio::cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| EngineError::AudioOutputUnavailable {
            details: format!("failed to list output devices: {e}"),
        })?;

    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "<unnamed>".to_owned()))
        .collect())
}
