use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Usage {
    Unknown,
    Media,
    VoiceCommunication,
    Alarm,
    Notification,
    NotificationRingtone,
    NotificationEvent,
    AssistanceSonification,
    Game,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContentType {
    Unknown,
    Speech,
    Music,
    Movie,
    Sonification,
}

/// Legacy volume stream. The discriminants are the wire values used by
/// callers that still speak raw stream numbers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamType {
    VoiceCall = 0,
    System = 1,
    Ring = 2,
    Music = 3,
    Alarm = 4,
    Notification = 5,
    Dtmf = 8,
}

impl StreamType {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for StreamType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StreamType::VoiceCall),
            1 => Ok(StreamType::System),
            2 => Ok(StreamType::Ring),
            3 => Ok(StreamType::Music),
            4 => Ok(StreamType::Alarm),
            5 => Ok(StreamType::Notification),
            8 => Ok(StreamType::Dtmf),
            other => Err(other),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PlaybackAttributes {
    pub usage: Usage,
    pub content_type: ContentType,
    legacy_stream: Option<StreamType>,
}

impl PlaybackAttributes {
    pub fn new(usage: Usage, content_type: ContentType) -> Self {
        Self {
            usage,
            content_type,
            legacy_stream: None,
        }
    }

    pub fn from_legacy_stream(stream: StreamType) -> Self {
        let (usage, content_type) = match stream {
            StreamType::VoiceCall => (Usage::VoiceCommunication, ContentType::Speech),
            StreamType::System => (Usage::AssistanceSonification, ContentType::Sonification),
            StreamType::Ring => (Usage::NotificationRingtone, ContentType::Sonification),
            StreamType::Music => (Usage::Media, ContentType::Music),
            StreamType::Alarm => (Usage::Alarm, ContentType::Sonification),
            StreamType::Notification => (Usage::Notification, ContentType::Sonification),
            StreamType::Dtmf => (Usage::Unknown, ContentType::Sonification),
        };
        Self {
            usage,
            content_type,
            legacy_stream: Some(stream),
        }
    }

    pub fn stream_type(&self) -> StreamType {
        if let Some(stream) = self.legacy_stream {
            return stream;
        }
        match self.usage {
            Usage::VoiceCommunication => StreamType::VoiceCall,
            Usage::Alarm => StreamType::Alarm,
            Usage::NotificationRingtone => StreamType::Ring,
            Usage::Notification | Usage::NotificationEvent => StreamType::Notification,
            Usage::AssistanceSonification => StreamType::System,
            Usage::Media | Usage::Game | Usage::Unknown => StreamType::Music,
        }
    }
}

impl Default for PlaybackAttributes {
    fn default() -> Self {
        Self::new(Usage::NotificationRingtone, ContentType::Sonification)
    }
}
