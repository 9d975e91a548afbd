//! Plan configuration.
//!
//! A `PlanConfig` is built once from the command line and handed by
//! reference to the classifier and plan builder. Nothing in the planning
//! code reads process-wide state.

use crate::{Error, Result};
use regex::Regex;

/// Audio codec that converted tracks are encoded to.
pub const TARGET_AUDIO_CODEC: &str = "ac3";

/// Codecs that are already acceptable and copied untouched.
pub const DEFAULT_PASSTHROUGH_CODECS: &[&str] = &["ac3", "eac3"];

pub const DEFAULT_LANGUAGES: &[&str] = &["ger", "eng"];

pub const DEFAULT_PRIMARY_LANGUAGE: &str = "ger";

/// Decisions that drive stream selection for every file in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanConfig {
    /// Audio languages that survive the language filter.
    pub accepted_languages: Vec<String>,
    /// Language whose first track becomes the default audio track.
    pub primary_language: String,
    /// Audio codecs copied without re-encoding.
    pub passthrough_codecs: Vec<String>,
    /// Subtitle codec that is converted to `text_subtitle_codec`.
    pub advanced_subtitle_codec: String,
    /// Subtitle codec advanced subtitles are converted to.
    pub text_subtitle_codec: String,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            accepted_languages: DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            primary_language: DEFAULT_PRIMARY_LANGUAGE.to_string(),
            passthrough_codecs: DEFAULT_PASSTHROUGH_CODECS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            advanced_subtitle_codec: "ass".to_string(),
            text_subtitle_codec: "srt".to_string(),
        }
    }
}

impl PlanConfig {
    /// Create a config with the given languages and default codec sets.
    pub fn new(accepted_languages: Vec<String>, primary_language: impl Into<String>) -> Self {
        Self {
            accepted_languages,
            primary_language: primary_language.into(),
            ..Self::default()
        }
    }

    /// Normalise tags to lowercase and check the config is usable.
    ///
    /// Language tags must be three-letter ISO 639-2 codes and the primary
    /// language must be one of the accepted ones.
    pub fn validate(mut self) -> Result<Self> {
        let tag = Regex::new("^[a-z]{3}$").map_err(|e| Error::InvalidConfig(e.to_string()))?;

        self.accepted_languages = normalize(self.accepted_languages);
        self.passthrough_codecs = normalize(self.passthrough_codecs);
        self.primary_language = self.primary_language.trim().to_ascii_lowercase();
        self.advanced_subtitle_codec = self.advanced_subtitle_codec.trim().to_ascii_lowercase();
        self.text_subtitle_codec = self.text_subtitle_codec.trim().to_ascii_lowercase();

        if self.accepted_languages.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one language must be accepted".into(),
            ));
        }
        if let Some(bad) = self.accepted_languages.iter().find(|l| !tag.is_match(l)) {
            return Err(Error::InvalidConfig(format!(
                "'{}' is not a three-letter language tag",
                bad
            )));
        }
        if !self.accepts_language(&self.primary_language) {
            return Err(Error::InvalidConfig(format!(
                "primary language '{}' is not in the accepted languages ({})",
                self.primary_language,
                self.accepted_languages.join(", ")
            )));
        }
        if self.passthrough_codecs.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one pass-through codec must be given".into(),
            ));
        }

        Ok(self)
    }

    pub fn accepts_language(&self, language: &str) -> bool {
        !language.is_empty() && self.accepted_languages.iter().any(|l| l == language)
    }

    pub fn is_passthrough(&self, codec: &str) -> bool {
        self.passthrough_codecs.iter().any(|c| c == codec)
    }
}

fn normalize(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_ascii_lowercase();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_is_valid() {
        let config = PlanConfig::default().validate().unwrap();
        assert_eq!(config.accepted_languages, langs(&["ger", "eng"]));
        assert_eq!(config.primary_language, "ger");
        assert!(config.is_passthrough("eac3"));
    }

    #[test]
    fn test_validate_normalizes_tags() {
        let config = PlanConfig::new(langs(&[" ENG", "Ger", "eng", ""]), "GER")
            .validate()
            .unwrap();
        assert_eq!(config.accepted_languages, langs(&["eng", "ger"]));
        assert_eq!(config.primary_language, "ger");
    }

    #[test]
    fn test_primary_must_be_accepted() {
        let err = PlanConfig::new(langs(&["eng"]), "ger").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_malformed_language() {
        let err = PlanConfig::new(langs(&["english"]), "english")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("three-letter"));
    }

    #[test]
    fn test_empty_language_never_accepted() {
        let config = PlanConfig::default();
        assert!(!config.accepts_language(""));
        assert!(config.accepts_language("eng"));
        assert!(!config.accepts_language("fra"));
    }
}
