use crate::attributes::StreamType;
use std::collections::BTreeMap;

pub trait VolumeService: Send + Sync {
    fn stream_volume(&self, stream: StreamType) -> u32;
}

/// Static volume table; streams without an entry report `default_level`.
#[derive(Clone, Debug, Default)]
pub struct FixedVolume {
    levels: BTreeMap<StreamType, u32>,
    default_level: u32,
}

impl FixedVolume {
    pub fn uniform(level: u32) -> Self {
        Self {
            levels: BTreeMap::new(),
            default_level: level,
        }
    }

    pub fn with_stream(mut self, stream: StreamType, level: u32) -> Self {
        self.levels.insert(stream, level);
        self
    }
}

impl VolumeService for FixedVolume {
    fn stream_volume(&self, stream: StreamType) -> u32 {
        self.levels
            .get(&stream)
            .copied()
            .unwrap_or(self.default_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_stream_levels_override_uniform_level() {
        let volume = FixedVolume::uniform(7).with_stream(StreamType::Ring, 0);
        assert_eq!(volume.stream_volume(StreamType::Ring), 0);
        assert_eq!(volume.stream_volume(StreamType::Alarm), 7);
    }
}
