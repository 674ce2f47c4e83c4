use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

pub const CONTENT_SCHEME: &str = "content";
pub const FILE_SCHEME: &str = "file";
pub const MEDIA_AUTHORITY: &str = "media";
pub const DRM_AUTHORITY: &str = "drm";
pub const SETTINGS_AUTHORITY: &str = "settings";

/// Highest number of ringtone slots a device can carry.
pub const MAX_RINGTONE_SLOTS: u8 = 3;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Authority {
    LocalFile,
    MediaIndex,
    DrmIndex,
    SettingsDefault,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MediaVolume {
    Internal,
    External,
}

impl MediaVolume {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaVolume::Internal => "internal",
            MediaVolume::External => "external",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DefaultSoundKind {
    Ringtone { slot: u8 },
    Notification,
    MmsNotification,
    Alarm,
}

impl DefaultSoundKind {
    pub fn ringtone(slot: u8) -> Option<Self> {
        (slot < MAX_RINGTONE_SLOTS).then_some(DefaultSoundKind::Ringtone { slot })
    }

    pub fn setting_key(&self) -> &'static str {
        match self {
            DefaultSoundKind::Ringtone { slot: 0 } => "ringtone",
            DefaultSoundKind::Ringtone { slot: 1 } => "ringtone_2",
            DefaultSoundKind::Ringtone { .. } => "ringtone_3",
            DefaultSoundKind::Notification => "notification_sound",
            DefaultSoundKind::MmsNotification => "mms_notification",
            DefaultSoundKind::Alarm => "alarm_alert",
        }
    }

    pub fn from_setting_key(key: &str) -> Option<Self> {
        match key {
            "ringtone" => Some(DefaultSoundKind::Ringtone { slot: 0 }),
            "ringtone_2" => Some(DefaultSoundKind::Ringtone { slot: 1 }),
            "ringtone_3" => Some(DefaultSoundKind::Ringtone { slot: 2 }),
            "notification_sound" => Some(DefaultSoundKind::Notification),
            "mms_notification" => Some(DefaultSoundKind::MmsNotification),
            "alarm_alert" => Some(DefaultSoundKind::Alarm),
            _ => None,
        }
    }

    pub fn ringtone_slot(&self) -> Option<u8> {
        match self {
            DefaultSoundKind::Ringtone { slot } => Some(*slot),
            _ => None,
        }
    }

    pub fn is_ringtone(&self) -> bool {
        self.ringtone_slot().is_some()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("invalid locator {input:?}: {reason}")]
    Invalid { input: String, reason: String },

    #[error("unsupported locator authority in {0}")]
    UnsupportedAuthority(String),

    #[error("file locator must be an absolute path: {0}")]
    RelativePath(String),
}

/// A sound locator. Always a URI internally; the authority is derived once at
/// construction and never changes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SoundReference {
    url: Url,
    authority: Authority,
}

impl SoundReference {
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let trimmed = input.trim();
        if trimmed.starts_with('/') {
            return Self::from_path(Path::new(trimmed));
        }
        let url = Url::parse(trimmed).map_err(|e| LocatorError::Invalid {
            input: trimmed.to_owned(),
            reason: e.to_string(),
        })?;
        Self::from_url(url)
    }

    pub fn from_path(path: &Path) -> Result<Self, LocatorError> {
        let url = Url::from_file_path(path)
            .map_err(|()| LocatorError::RelativePath(path.display().to_string()))?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> Result<Self, LocatorError> {
        let authority = match (url.scheme(), url.host_str()) {
            (FILE_SCHEME, _) => Authority::LocalFile,
            (CONTENT_SCHEME, Some(MEDIA_AUTHORITY)) => Authority::MediaIndex,
            (CONTENT_SCHEME, Some(DRM_AUTHORITY)) => Authority::DrmIndex,
            (CONTENT_SCHEME, Some(SETTINGS_AUTHORITY)) => Authority::SettingsDefault,
            _ => return Err(LocatorError::UnsupportedAuthority(url.to_string())),
        };
        Ok(Self { url, authority })
    }

    pub fn media(volume: MediaVolume, id: i64) -> Self {
        Self::content(
            MEDIA_AUTHORITY,
            &format!("/{}/audio/media/{id}", volume.as_str()),
            Authority::MediaIndex,
        )
    }

    pub fn drm(id: i64) -> Self {
        Self::content(DRM_AUTHORITY, &format!("/audio/{id}"), Authority::DrmIndex)
    }

    pub fn settings_default(kind: DefaultSoundKind) -> Self {
        Self::content(
            SETTINGS_AUTHORITY,
            &format!("/system/{}", kind.setting_key()),
            Authority::SettingsDefault,
        )
    }

    fn content(host: &str, path: &str, authority: Authority) -> Self {
        let mut url = Url::parse(&format!("{CONTENT_SCHEME}://{host}"))
            .unwrap_or_else(|_| unreachable!("static content locator is well-formed"));
        url.set_path(path);
        Self { url, authority }
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn last_path_segment(&self) -> Option<String> {
        let segment = self
            .url
            .path_segments()?
            .filter(|s| !s.is_empty())
            .next_back()?;
        let decoded = urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_owned());
        Some(decoded)
    }

    pub fn id(&self) -> Option<i64> {
        match self.authority {
            Authority::MediaIndex | Authority::DrmIndex => self.last_path_segment()?.parse().ok(),
            _ => None,
        }
    }

    pub fn media_volume(&self) -> Option<MediaVolume> {
        if self.authority != Authority::MediaIndex {
            return None;
        }
        match self.url.path_segments()?.find(|s| !s.is_empty())? {
            "internal" => Some(MediaVolume::Internal),
            "external" => Some(MediaVolume::External),
            _ => None,
        }
    }

    pub fn default_kind(&self) -> Option<DefaultSoundKind> {
        if self.authority != Authority::SettingsDefault {
            return None;
        }
        DefaultSoundKind::from_setting_key(&self.last_path_segment()?)
    }

    pub fn to_file_path(&self) -> Option<PathBuf> {
        match self.authority {
            Authority::LocalFile => self.url.to_file_path().ok(),
            _ => None,
        }
    }

    /// Normalized form for handing to another process: no fragment, no
    /// query, no empty path segments.
    pub fn canonical(&self) -> SoundReference {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.set_query(None);
        let segments: Vec<String> = self
            .url
            .path_segments()
            .map(|it| it.filter(|s| !s.is_empty()).map(str::to_owned).collect())
            .unwrap_or_default();
        if !segments.is_empty() {
            url.set_path(&format!("/{}", segments.join("/")));
        }
        Self {
            url,
            authority: self.authority,
        }
    }
}

impl fmt::Display for SoundReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl FromStr for SoundReference {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
