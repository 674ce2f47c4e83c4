use crate::locator::{DefaultSoundKind, MAX_RINGTONE_SLOTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_FALLBACK_ASSET: &str = "fallbackring.ogg";
pub const DEFAULT_RESTORE_SLOTS: u8 = 2;
pub const DEFAULT_LABEL: &str = "Default ringtone";
pub const DEFAULT_WITH_ACTUAL_LABEL: &str = "Default ({title})";
pub const UNKNOWN_LABEL: &str = "Unknown ringtone";
pub const TITLE_PLACEHOLDER: &str = "{title}";
pub const ENV_ALLOW_REMOTE: &str = "RINGTONE_ALLOW_REMOTE";
pub const ENV_SOUND_CUSTOMIZED: &str = "RINGTONE_SOUND_CUSTOMIZED";
pub const ENV_RESTORE_SLOTS: &str = "RINGTONE_RESTORE_SLOTS";
pub const ENV_DEFAULT_FILE_PREFIX: &str = "RINGTONE_DEFAULT_";

const ALL_DEFAULT_KINDS: [DefaultSoundKind; 6] = [
    DefaultSoundKind::Ringtone { slot: 0 },
    DefaultSoundKind::Ringtone { slot: 1 },
    DefaultSoundKind::Ringtone { slot: 2 },
    DefaultSoundKind::Notification,
    DefaultSoundKind::MmsNotification,
    DefaultSoundKind::Alarm,
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("restore slots must be between 1 and {max}, got {0}", max = MAX_RINGTONE_SLOTS)]
    InvalidRestoreSlots(u8),
    #[error("title labels must not be empty")]
    EmptyLabel,
    #[error("default-with-title label must contain {{title}}")]
    MissingTitlePlaceholder,
    #[error("{key} must be true or false, got {value:?}")]
    InvalidBool { key: String, value: String },
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: String, value: String },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestoreSlots(u8);

impl RestoreSlots {
    pub fn new(count: u8) -> Result<Self, ConfigError> {
        if count == 0 || count > MAX_RINGTONE_SLOTS {
            return Err(ConfigError::InvalidRestoreSlots(count));
        }
        Ok(Self(count))
    }

    pub fn count(&self) -> u8 {
        self.0
    }

    pub fn kinds(&self) -> impl Iterator<Item = DefaultSoundKind> {
        (0..self.0).filter_map(DefaultSoundKind::ringtone)
    }
}

impl Default for RestoreSlots {
    fn default() -> Self {
        Self(DEFAULT_RESTORE_SLOTS)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TitleLabels {
    default_label: String,
    default_with_actual: String,
    unknown: String,
}

impl TitleLabels {
    pub fn new<S: Into<String>>(
        default_label: S,
        default_with_actual: S,
        unknown: S,
    ) -> Result<Self, ConfigError> {
        let labels = Self {
            default_label: default_label.into(),
            default_with_actual: default_with_actual.into(),
            unknown: unknown.into(),
        };
        if [&labels.default_label, &labels.default_with_actual, &labels.unknown]
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err(ConfigError::EmptyLabel);
        }
        if !labels.default_with_actual.contains(TITLE_PLACEHOLDER) {
            return Err(ConfigError::MissingTitlePlaceholder);
        }
        Ok(labels)
    }

    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    pub fn unknown(&self) -> &str {
        &self.unknown
    }

    pub fn default_with_actual(&self, actual_title: &str) -> String {
        self.default_with_actual
            .replace(TITLE_PLACEHOLDER, actual_title)
    }
}

impl Default for TitleLabels {
    fn default() -> Self {
        Self {
            default_label: DEFAULT_LABEL.to_owned(),
            default_with_actual: DEFAULT_WITH_ACTUAL_LABEL.to_owned(),
            unknown: UNKNOWN_LABEL.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreConfig {
    pub enabled: bool,
    pub slots: RestoreSlots,
    pub default_file_names: BTreeMap<DefaultSoundKind, String>,
}

impl RestoreConfig {
    pub fn default_file_name(&self, kind: DefaultSoundKind) -> Option<&str> {
        self.default_file_names.get(&kind).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Whether sessions may delegate to a remote player. False when the
    /// resolver itself runs inside the remote player.
    pub allow_remote: bool,
    pub labels: TitleLabels,
    pub restore: RestoreConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            allow_remote: true,
            labels: TitleLabels::default(),
            restore: RestoreConfig::default(),
        }
    }
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_bool(
    cli_value: Option<bool>,
    env_key: &str,
    env: &impl Env,
    default: bool,
) -> Result<bool, ConfigError> {
    if let Some(v) = cli_value {
        return Ok(v);
    }
    match env.var(env_key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool {
                key: env_key.to_owned(),
                value: raw,
            }),
        },
    }
}

pub fn resolve_restore_slots(
    cli_value: Option<u8>,
    env: &impl Env,
) -> Result<RestoreSlots, ConfigError> {
    let count = match cli_value {
        Some(v) => v,
        None => match env.var(ENV_RESTORE_SLOTS) {
            Some(raw) => raw.trim().parse::<u8>().map_err(|_| ConfigError::InvalidNumber {
                key: ENV_RESTORE_SLOTS.to_owned(),
                value: raw,
            })?,
            None => DEFAULT_RESTORE_SLOTS,
        },
    };
    RestoreSlots::new(count)
}

pub fn default_file_env_key(kind: DefaultSoundKind) -> String {
    format!(
        "{ENV_DEFAULT_FILE_PREFIX}{}",
        kind.setting_key().to_ascii_uppercase()
    )
}

pub fn resolve_default_file_names(
    customized: &BTreeMap<DefaultSoundKind, String>,
    env: &impl Env,
) -> BTreeMap<DefaultSoundKind, String> {
    ALL_DEFAULT_KINDS
        .iter()
        .filter_map(|kind| {
            let custom = customized
                .get(kind)
                .filter(|name| !name.trim().is_empty())
                .cloned();
            let name = custom.or_else(|| {
                env.var(&default_file_env_key(*kind))
                    .filter(|name| !name.trim().is_empty())
            })?;
            Some((*kind, name))
        })
        .collect()
}
