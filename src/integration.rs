//! Download and library manager hooks.
//!
//! NZBGet post-processing scripts, Sonarr and Radarr custom scripts pass
//! their job through environment variables. When one of them invoked us,
//! the command line paths are ignored and the overwrite flag is forced on.

use std::fmt;
use std::path::PathBuf;

const NZBGET_SUCCESS: u8 = 93;
const NZBGET_ERROR: u8 = 94;
const NZBGET_NONE: u8 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    NzbGet,
    Sonarr,
    Radarr,
}

impl TriggerSource {
    /// Whether the handed over path is a directory to scan recursively.
    pub fn recursive(self) -> bool {
        matches!(self, TriggerSource::NzbGet)
    }

    /// Process exit code reporting the result back to the caller.
    pub fn exit_code(self, success: bool) -> u8 {
        match (self, success) {
            (TriggerSource::NzbGet, true) => NZBGET_SUCCESS,
            (TriggerSource::NzbGet, false) => NZBGET_ERROR,
            (_, true) => 0,
            (_, false) => 1,
        }
    }

    /// Exit code when there was nothing to do.
    pub fn ignored_exit_code(self) -> u8 {
        match self {
            TriggerSource::NzbGet => NZBGET_NONE,
            _ => 0,
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerSource::NzbGet => "NZBGet",
            TriggerSource::Sonarr => "Sonarr",
            TriggerSource::Radarr => "Radarr",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Process a completed download directory or an imported file.
    Process { source: TriggerSource, path: PathBuf },
    /// Invoked without work, e.g. a connection test or a failed download.
    Ignore { source: TriggerSource, reason: String },
}

impl Trigger {
    pub fn source(&self) -> TriggerSource {
        match self {
            Trigger::Process { source, .. } | Trigger::Ignore { source, .. } => *source,
        }
    }
}

/// Detect a trigger from the process environment.
pub fn from_env() -> Option<Trigger> {
    detect(|key| std::env::var(key).ok())
}

/// Detect a trigger from a variable lookup.
pub fn detect(var: impl Fn(&str) -> Option<String>) -> Option<Trigger> {
    let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

    for (source, prefix, file_var) in [
        (TriggerSource::Sonarr, "sonarr", "sonarr_episodefile_path"),
        (TriggerSource::Radarr, "radarr", "radarr_moviefile_path"),
    ] {
        let event = var(&format!("{}_eventtype", prefix));
        let file = var(file_var);
        if event.is_none() && file.is_none() {
            continue;
        }
        if let Some(event) = event.as_deref() {
            if event.eq_ignore_ascii_case("test") {
                return Some(Trigger::Ignore {
                    source,
                    reason: "connection test".to_string(),
                });
            }
        }
        return Some(match file {
            Some(path) => Trigger::Process {
                source,
                path: PathBuf::from(path),
            },
            None => Trigger::Ignore {
                source,
                reason: format!(
                    "event '{}' carries no file",
                    event.unwrap_or_default()
                ),
            },
        });
    }

    let directory = var("NZBPP_DIRECTORY")?;
    if let Some(status) = var("NZBPP_TOTALSTATUS") {
        if status != "SUCCESS" {
            return Some(Trigger::Ignore {
                source: TriggerSource::NzbGet,
                reason: format!("download status is {}", status),
            });
        }
    }
    Some(Trigger::Process {
        source: TriggerSource::NzbGet,
        path: PathBuf::from(directory),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn detect_from(vars: &[(&str, &str)]) -> Option<Trigger> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        detect(|key| map.get(key).cloned())
    }

    #[test]
    fn test_no_trigger() {
        assert_eq!(detect_from(&[("HOME", "/root")]), None);
        assert_eq!(detect_from(&[("NZBPP_DIRECTORY", "")]), None);
    }

    #[test]
    fn test_sonarr_file() {
        let trigger = detect_from(&[
            ("sonarr_eventtype", "Download"),
            ("sonarr_episodefile_path", "/tv/Show/S01E01.mkv"),
        ]);
        assert_eq!(
            trigger,
            Some(Trigger::Process {
                source: TriggerSource::Sonarr,
                path: PathBuf::from("/tv/Show/S01E01.mkv"),
            })
        );
    }

    #[test]
    fn test_radarr_test_event_ignored() {
        let trigger = detect_from(&[("radarr_eventtype", "Test")]).unwrap();
        assert!(matches!(trigger, Trigger::Ignore { source: TriggerSource::Radarr, .. }));
        assert_eq!(trigger.source().ignored_exit_code(), 0);
    }

    #[test]
    fn test_radarr_event_without_file() {
        let trigger = detect_from(&[("radarr_eventtype", "Grab")]).unwrap();
        match trigger {
            Trigger::Ignore { reason, .. } => assert!(reason.contains("Grab")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nzbget_directory() {
        let trigger = detect_from(&[
            ("NZBPP_DIRECTORY", "/downloads/complete/Movie.2001"),
            ("NZBPP_TOTALSTATUS", "SUCCESS"),
        ])
        .unwrap();
        assert_eq!(trigger.source(), TriggerSource::NzbGet);
        assert!(trigger.source().recursive());
        assert!(matches!(trigger, Trigger::Process { .. }));
    }

    #[test]
    fn test_nzbget_failed_download_ignored() {
        let trigger = detect_from(&[
            ("NZBPP_DIRECTORY", "/downloads/complete/Movie.2001"),
            ("NZBPP_TOTALSTATUS", "FAILURE"),
        ])
        .unwrap();
        assert!(matches!(trigger, Trigger::Ignore { .. }));
        assert_eq!(trigger.source().ignored_exit_code(), 95);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(TriggerSource::NzbGet.exit_code(true), 93);
        assert_eq!(TriggerSource::NzbGet.exit_code(false), 94);
        assert_eq!(TriggerSource::Sonarr.exit_code(true), 0);
        assert_eq!(TriggerSource::Radarr.exit_code(false), 1);
        assert!(!TriggerSource::Sonarr.recursive());
    }
}
