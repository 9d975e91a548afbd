//! Stream probing with ffprobe.

use crate::stream::{MediaStreams, StreamDescriptor};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Something that can list the streams of a media file.
pub trait Probe: Send + Sync {
    /// Probe `path`. An empty audio list is a valid result.
    fn probe(&self, path: &Path) -> Result<MediaStreams>;
}

/// Probes files by running `ffprobe` and parsing its JSON output.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            program: "ffprobe".to_string(),
        }
    }
}

impl FfprobeProbe {
    /// Use a specific ffprobe binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Probe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Result<MediaStreams> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(&self.program)
                } else {
                    Error::probe(path, e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("ffprobe exited with {}", output.status),
                s => s.to_string(),
            };
            return Err(Error::probe(path, message));
        }

        parse_ffprobe_json(path, &output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    #[serde(default)]
    codec_type: String,
    codec_name: Option<String>,
    channels: Option<u32>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
}

/// Parse `ffprobe -show_format -show_streams` JSON into descriptors.
///
/// A document without a format section is not a recognised container.
pub fn parse_ffprobe_json(path: &Path, json: &[u8]) -> Result<MediaStreams> {
    let output: FfprobeOutput =
        serde_json::from_slice(json).map_err(|e| Error::probe(path, e.to_string()))?;

    let format = output
        .format
        .ok_or_else(|| Error::probe(path, "not a recognised media container"))?;

    let mut streams = MediaStreams {
        duration: format
            .duration
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(Duration::from_secs_f64),
        ..Default::default()
    };

    for stream in output.streams {
        let descriptor = StreamDescriptor {
            index: stream.index,
            codec: stream
                .codec_name
                .unwrap_or_default()
                .to_ascii_lowercase(),
            channels: stream.channels.filter(|&c| c > 0),
            language: stream
                .tags
                .language
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase(),
        };
        match stream.codec_type.as_str() {
            "audio" => streams.audio.push(descriptor),
            "subtitle" => streams.subtitle.push(descriptor),
            _ => {}
        }
    }

    Ok(streams)
}
