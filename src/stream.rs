//! Probed stream metadata.

use std::time::Duration;

/// One probed stream of a media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Position of the stream in the source container.
    pub index: u32,
    /// Lowercase codec name as reported by the probe, e.g. "aac" or "ass".
    pub codec: String,
    /// Channel count. Only meaningful for audio.
    pub channels: Option<u32>,
    /// Lowercase language tag, empty when the stream is untagged.
    pub language: String,
}

impl StreamDescriptor {
    pub fn audio(index: u32, codec: &str, channels: u32, language: &str) -> Self {
        Self {
            index,
            codec: codec.to_ascii_lowercase(),
            channels: Some(channels),
            language: language.to_ascii_lowercase(),
        }
    }

    pub fn subtitle(index: u32, codec: &str, language: &str) -> Self {
        Self {
            index,
            codec: codec.to_ascii_lowercase(),
            channels: None,
            language: language.to_ascii_lowercase(),
        }
    }
}

/// Streams of one file, split by kind, in probe order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStreams {
    pub audio: Vec<StreamDescriptor>,
    pub subtitle: Vec<StreamDescriptor>,
    /// Container duration, used for progress reporting only.
    pub duration: Option<Duration>,
}

impl MediaStreams {
    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }
}
