//! Stream plans: the complete set of output track directives for one file.

use crate::classifier::{classify_audio, classify_subtitle};
use crate::config::PlanConfig;
use crate::stream::MediaStreams;
use std::fmt;

/// Encoding parameters for a converted track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertTarget {
    pub codec: String,
    /// Output channel count (audio only).
    pub channels: Option<u32>,
    /// Output bitrate in kbps (audio only).
    pub bitrate_kbps: Option<u32>,
    /// Track title written to the container (audio only).
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackAction {
    /// Stream is copied byte for byte.
    Copy,
    /// Stream is re-encoded.
    Convert(ConvertTarget),
}

/// One output track, derived from one source stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDirective {
    /// Index of the source stream in the input container.
    pub source_index: u32,
    /// Dense, zero-based position among output tracks of the same kind.
    pub output_index: usize,
    pub action: TrackAction,
    /// Whether this is the default audio track. Always false for subtitles.
    pub is_default: bool,
    pub language: String,
}

impl TrackDirective {
    pub fn is_convert(&self) -> bool {
        matches!(self.action, TrackAction::Convert(_))
    }
}

impl fmt::Display for TrackDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} -> {} [{}]",
            self.source_index,
            self.output_index,
            if self.language.is_empty() {
                "und"
            } else {
                self.language.as_str()
            }
        )?;
        match &self.action {
            TrackAction::Copy => write!(f, " copy")?,
            TrackAction::Convert(target) => {
                write!(f, " convert to {}", target.codec)?;
                if let Some(title) = &target.title {
                    write!(f, " \"{}\"", title)?;
                }
            }
        }
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// Output directives for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPlan {
    pub audio: Vec<TrackDirective>,
    pub subtitle: Vec<TrackDirective>,
}

impl StreamPlan {
    /// True iff at least one track is re-encoded.
    pub fn requires_transcode(&self) -> bool {
        self.directives().any(TrackDirective::is_convert)
    }

    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }

    pub fn default_audio(&self) -> Option<&TrackDirective> {
        self.audio.iter().find(|d| d.is_default)
    }

    pub fn directives(&self) -> impl Iterator<Item = &TrackDirective> {
        self.audio.iter().chain(self.subtitle.iter())
    }
}

/// Build the stream plan for one file.
///
/// Audio streams are visited in probe order. The first accepted stream in
/// the primary language becomes the default track but keeps its position.
/// Every subtitle stream is kept. Exactly one audio track is default only
/// when a primary-language track survives; otherwise none is.
pub fn build_plan(streams: &MediaStreams, config: &PlanConfig) -> StreamPlan {
    let mut plan = StreamPlan::default();
    let mut primary_assigned = false;

    for stream in &streams.audio {
        let is_primary = !primary_assigned && stream.language == config.primary_language;
        if let Some(directive) = classify_audio(stream, plan.audio.len(), is_primary, config) {
            primary_assigned |= directive.is_default;
            plan.audio.push(directive);
        }
    }

    for stream in &streams.subtitle {
        let directive = classify_subtitle(stream, plan.subtitle.len(), config);
        plan.subtitle.push(directive);
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamDescriptor;

    fn config(accepted: &[&str], primary: &str) -> PlanConfig {
        PlanConfig::new(accepted.iter().map(|s| s.to_string()).collect(), primary)
    }

    fn audio(list: &[(u32, &str, u32, &str)]) -> MediaStreams {
        MediaStreams {
            audio: list
                .iter()
                .map(|&(i, codec, ch, lang)| StreamDescriptor::audio(i, codec, ch, lang))
                .collect(),
            ..Default::default()
        }
    }

    fn assert_dense(directives: &[TrackDirective]) {
        for (expected, d) in directives.iter().enumerate() {
            assert_eq!(d.output_index, expected);
        }
    }

    #[test]
    fn test_scenario_mixed_languages() {
        let streams = audio(&[(0, "aac", 2, "eng"), (1, "ac3", 6, "ger")]);
        let plan = build_plan(&streams, &config(&["eng", "ger"], "ger"));

        assert_eq!(plan.audio.len(), 2);
        let eng = &plan.audio[0];
        match &eng.action {
            TrackAction::Convert(t) => {
                assert_eq!(t.bitrate_kbps, Some(224));
                assert_eq!(t.channels, Some(2));
            }
            TrackAction::Copy => panic!("aac must be converted"),
        }
        assert!(!eng.is_default);

        let ger = &plan.audio[1];
        assert_eq!(ger.action, TrackAction::Copy);
        assert!(ger.is_default);
        assert_eq!(ger.output_index, 1);
        assert!(plan.requires_transcode());
    }

    #[test]
    fn test_scenario_no_accepted_language() {
        let streams = audio(&[(0, "ac3", 6, "fra")]);
        let plan = build_plan(&streams, &config(&["eng", "ger"], "ger"));
        assert!(plan.audio.is_empty());
        assert!(!plan.requires_transcode());
        assert!(plan.default_audio().is_none());
    }

    #[test]
    fn test_scenario_eight_channel_primary() {
        let streams = audio(&[(0, "dts", 8, "ger")]);
        let plan = build_plan(&streams, &config(&["eng", "ger"], "ger"));
        assert_eq!(plan.audio.len(), 1);
        let d = &plan.audio[0];
        assert!(d.is_default);
        match &d.action {
            TrackAction::Convert(t) => {
                assert_eq!(t.channels, Some(6));
                assert_eq!(t.bitrate_kbps, Some(640));
            }
            TrackAction::Copy => panic!("dts must be converted"),
        }
    }

    #[test]
    fn test_only_first_primary_is_default() {
        let streams = audio(&[
            (1, "ac3", 2, "eng"),
            (2, "dts", 6, "ger"),
            (3, "aac", 2, "ger"),
        ]);
        let plan = build_plan(&streams, &config(&["eng", "ger"], "ger"));
        let defaults: Vec<_> = plan.audio.iter().filter(|d| d.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].source_index, 2);
    }

    #[test]
    fn test_no_default_without_primary_language() {
        let streams = audio(&[(0, "aac", 2, "eng"), (1, "ac3", 6, "eng")]);
        let plan = build_plan(&streams, &config(&["eng", "ger"], "ger"));
        assert_eq!(plan.audio.len(), 2);
        assert!(plan.default_audio().is_none());
    }

    #[test]
    fn test_output_indices_skip_dropped_streams() {
        let streams = audio(&[
            (1, "aac", 2, "fra"),
            (2, "aac", 2, "eng"),
            (3, "ac3", 6, ""),
            (4, "flac", 2, "ger"),
            (5, "eac3", 6, "spa"),
            (6, "eac3", 6, "eng"),
        ]);
        let plan = build_plan(&streams, &config(&["eng", "ger"], "ger"));
        let sources: Vec<u32> = plan.audio.iter().map(|d| d.source_index).collect();
        assert_eq!(sources, vec![2, 4, 6]);
        assert_dense(&plan.audio);
        assert_eq!(plan.default_audio().map(|d| d.source_index), Some(4));
    }

    #[test]
    fn test_all_copy_requires_no_transcode() {
        let streams = audio(&[(0, "ac3", 6, "ger"), (1, "eac3", 2, "eng")]);
        let plan = build_plan(&streams, &config(&["eng", "ger"], "ger"));
        assert!(!plan.requires_transcode());
        assert!(plan.directives().all(|d| d.action == TrackAction::Copy));
    }

    #[test]
    fn test_subtitles_kept_and_indexed() {
        let mut streams = audio(&[(1, "ac3", 6, "ger")]);
        streams.subtitle = vec![
            StreamDescriptor::subtitle(2, "subrip", "fra"),
            StreamDescriptor::subtitle(3, "ass", ""),
            StreamDescriptor::subtitle(4, "hdmv_pgs_subtitle", "ger"),
        ];
        let plan = build_plan(&streams, &config(&["ger"], "ger"));

        assert_eq!(plan.subtitle.len(), 3);
        assert_dense(&plan.subtitle);
        assert!(plan.subtitle.iter().all(|d| !d.is_default));
        assert!(plan.subtitle[1].is_convert());
        assert!(plan.requires_transcode());
    }

    #[test]
    fn test_directive_display() {
        let streams = audio(&[(3, "aac", 6, "ger")]);
        let plan = build_plan(&streams, &config(&["ger"], "ger"));
        assert_eq!(
            plan.audio[0].to_string(),
            "#3 -> 0 [ger] convert to ac3 \"ger AC3 5.1 @ 640k\" (default)"
        );
    }
}
