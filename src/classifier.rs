//! Per-stream keep/copy/convert decisions.

use crate::config::{PlanConfig, TARGET_AUDIO_CODEC};
use crate::plan::{ConvertTarget, TrackAction, TrackDirective};
use crate::stream::StreamDescriptor;

/// AC3 encoding parameters for a source channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurroundTarget {
    pub channels: u32,
    pub bitrate_kbps: u32,
    pub label: &'static str,
}

/// Maps a source channel count to AC3 output channels and bitrate.
///
/// Five or more source channels always become 5.1, so 7.1 sources are
/// downmixed.
pub fn surround_target(channels: u32) -> SurroundTarget {
    match channels {
        0 | 1 => SurroundTarget {
            channels: 1,
            bitrate_kbps: 128,
            label: "1.0 @ 128k",
        },
        2 => SurroundTarget {
            channels: 2,
            bitrate_kbps: 224,
            label: "2.0 @ 224k",
        },
        3 => SurroundTarget {
            channels: 3,
            bitrate_kbps: 320,
            label: "3.0 @ 320k",
        },
        4 => SurroundTarget {
            channels: 4,
            bitrate_kbps: 448,
            label: "4.0 @ 448k",
        },
        _ => SurroundTarget {
            channels: 6,
            bitrate_kbps: 640,
            label: "5.1 @ 640k",
        },
    }
}

/// Decide what happens to one audio stream.
///
/// Returns `None` when the stream's language is not accepted; the stream is
/// then dropped from the output. Streams already in a pass-through codec are
/// copied regardless of their channel count.
pub fn classify_audio(
    stream: &StreamDescriptor,
    output_index: usize,
    is_primary: bool,
    config: &PlanConfig,
) -> Option<TrackDirective> {
    if !config.accepts_language(&stream.language) {
        return None;
    }

    let action = if config.is_passthrough(&stream.codec) {
        TrackAction::Copy
    } else {
        // Untagged channel layouts are treated as stereo.
        let target = surround_target(stream.channels.unwrap_or(2));
        TrackAction::Convert(ConvertTarget {
            codec: TARGET_AUDIO_CODEC.to_string(),
            channels: Some(target.channels),
            bitrate_kbps: Some(target.bitrate_kbps),
            title: Some(format!("{} AC3 {}", stream.language, target.label)),
        })
    };

    Some(TrackDirective {
        source_index: stream.index,
        output_index,
        action,
        is_default: is_primary,
        language: stream.language.clone(),
    })
}

/// Decide what happens to one subtitle stream. Subtitles are never dropped.
pub fn classify_subtitle(
    stream: &StreamDescriptor,
    output_index: usize,
    config: &PlanConfig,
) -> TrackDirective {
    let action = if stream.codec == config.advanced_subtitle_codec {
        TrackAction::Convert(ConvertTarget {
            codec: config.text_subtitle_codec.clone(),
            channels: None,
            bitrate_kbps: None,
            title: None,
        })
    } else {
        TrackAction::Copy
    };

    TrackDirective {
        source_index: stream.index,
        output_index,
        action,
        is_default: false,
        language: stream.language.clone(),
    }
}
