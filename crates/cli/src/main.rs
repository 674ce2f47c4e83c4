#![deny(warnings)]

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::Parser;
use ringtone_core::assets::DirectoryAssetStore;
use ringtone_core::config::{
    resolve_bool, resolve_default_file_names, resolve_restore_slots, Env, ResolverConfig,
    RestoreConfig, StdEnv, TitleLabels, DEFAULT_FALLBACK_ASSET, ENV_ALLOW_REMOTE,
    ENV_RESTORE_SLOTS, ENV_SOUND_CUSTOMIZED,
};
use ringtone_core::index::{ContentIndex, DirectoryIndex};
use ringtone_core::playback::{DummyPlaybackEngine, PlaybackEngine, RodioPlaybackEngine};
use ringtone_core::remote::{RemotePlayerService, RemoteSurface};
use ringtone_core::settings::{JsonSettingsStore, SettingsStore};
use ringtone_core::volume::FixedVolume;
use ringtone_core::{Collaborators, DefaultSoundKind, PlaybackResolver, SoundReference};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const ENV_DEFAULT_RINGTONE: &str = "RINGTONE_DEFAULT_RINGTONE";

#[derive(Parser, Debug)]
#[command(name = "ringtone")]
#[command(about = "Resolve and play a ringtone, notification or alarm sound")]
struct Args {
    /// Sound locator: a content:// reference, file:// URL or absolute path.
    #[arg(long, required_unless_present = "list_devices")]
    sound: Option<String>,

    #[arg(long, default_value = "ringtones")]
    internal_dir: PathBuf,

    #[arg(long)]
    external_dir: Option<PathBuf>,

    /// JSON file holding default sound settings. In-memory when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, default_value = "assets")]
    asset_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_FALLBACK_ASSET)]
    fallback_asset: String,

    #[arg(long, default_value_t = 7)]
    volume: u32,

    /// Legacy stream number applied before playing.
    #[arg(long)]
    stream_type: Option<i32>,

    #[arg(long)]
    no_remote: bool,

    #[arg(long, env = ENV_SOUND_CUSTOMIZED, value_parser = BoolishValueParser::new())]
    sound_customized: Option<bool>,

    /// Shipped file name the first ringtone slot is restored to.
    #[arg(long, env = ENV_DEFAULT_RINGTONE)]
    default_ringtone: Option<String>,

    #[arg(long, env = ENV_RESTORE_SLOTS)]
    restore_slots: Option<u8>,

    /// Open sounds without an audio device.
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    title_only: bool,

    #[arg(long)]
    output_device: Option<String>,

    #[arg(long, default_value_t = 5000)]
    play_ms: u64,

    #[arg(long)]
    list_devices: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    if args.list_devices {
        return list_devices();
    }

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;

    tracing::info!(
        allow_remote = cfg.allow_remote,
        restore = cfg.restore.enabled,
        restore_slots = cfg.restore.slots.count(),
        "config loaded"
    );

    run(args, cfg)
}

#[cfg(feature = "playback-device-enum")]
fn list_devices() -> anyhow::Result<()> {
    for name in ringtone_core::playback::enumerate_output_device_names()? {
        println!("{name}");
    }
    Ok(())
}

#[cfg(not(feature = "playback-device-enum"))]
fn list_devices() -> anyhow::Result<()> {
    anyhow::bail!("--list-devices requires the playback-device-enum feature")
}

fn run(args: Args, cfg: ResolverConfig) -> anyhow::Result<()> {
    let sound = args
        .sound
        .as_deref()
        .context("--sound is required")?;
    let sound: SoundReference = sound
        .parse()
        .with_context(|| format!("invalid --sound: {sound}"))?;

    let mut index = DirectoryIndex::new(&args.internal_dir);
    if let Some(dir) = &args.external_dir {
        index = index.with_external_dir(dir);
    }
    let index: Arc<dyn ContentIndex> = Arc::new(index);

    let settings: Arc<dyn SettingsStore> = match &args.settings {
        Some(path) => Arc::new(
            JsonSettingsStore::open(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
        ),
        None => Arc::new(JsonSettingsStore::in_memory()),
    };

    let engine: Arc<dyn PlaybackEngine> = if args.dry_run {
        Arc::new(DummyPlaybackEngine::new())
    } else {
        let mut engine = RodioPlaybackEngine::new(index.clone());
        if let Some(device) = &args.output_device {
            engine = engine.with_output_device_name(device.clone());
        }
        Arc::new(engine)
    };

    let remote = if cfg.allow_remote {
        let (service, surface) = RemotePlayerService::spawn(engine.clone())
            .context("failed to start remote player")?;
        Some((service, Arc::new(surface)))
    } else {
        None
    };

    let collaborators = Collaborators {
        engine,
        index,
        settings,
        volume: Arc::new(FixedVolume::uniform(args.volume)),
        assets: Arc::new(DirectoryAssetStore::new(&args.asset_dir, &args.fallback_asset)),
        remote: remote
            .as_ref()
            .map(|(_, surface)| surface.clone() as Arc<dyn RemoteSurface>),
    };

    let mut session = PlaybackResolver::new(collaborators, cfg);
    if let Some(stream_type) = args.stream_type {
        session.set_stream_type(stream_type)?;
    }
    session.set_reference(Some(sound));

    println!("{}", session.title());
    if args.title_only {
        return Ok(());
    }

    tracing::info!(
        state = ?session.state(),
        stream = ?session.stream_type(),
        "playing"
    );
    session.play();

    let deadline = Instant::now() + Duration::from_millis(args.play_ms);
    while session.is_playing() && Instant::now() < deadline {
        std::thread::sleep(POLL_INTERVAL);
    }
    session.stop();
    drop(session);

    if let Some((service, _)) = remote {
        service.shutdown();
    }
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: &Args, env: &impl Env) -> anyhow::Result<ResolverConfig> {
    let allow_remote = resolve_bool(
        args.no_remote.then_some(false),
        ENV_ALLOW_REMOTE,
        env,
        true,
    )?;
    let customized = resolve_bool(args.sound_customized, ENV_SOUND_CUSTOMIZED, env, false)?;
    let slots = resolve_restore_slots(args.restore_slots, env)?;

    let mut names = BTreeMap::new();
    if let Some(name) = &args.default_ringtone {
        names.insert(DefaultSoundKind::Ringtone { slot: 0 }, name.clone());
    }

    Ok(ResolverConfig {
        allow_remote,
        labels: TitleLabels::default(),
        restore: RestoreConfig {
            enabled: customized,
            slots,
            default_file_names: resolve_default_file_names(&names, env),
        },
    })
}
