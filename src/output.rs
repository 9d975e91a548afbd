//! Output file naming and finalisation.
//!
//! ffmpeg always writes to an in-flight path next to the input. Only after
//! it reports success is that file renamed to its final name, which is the
//! input path itself when overwriting.

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Inserted between the file stem and the extension of produced files.
pub const OUTPUT_SUFFIX: &str = "-ac3";

const TEMP_MARKER: &str = "-ac3-temp-";

/// Paths used while transcoding one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Where ffmpeg writes.
    pub in_flight: PathBuf,
    /// Where the result ends up on success.
    pub destination: PathBuf,
}

impl OutputPaths {
    /// Derive the paths for `input`.
    ///
    /// The in-flight name carries the process id, so concurrent runs over the
    /// same tree never write to the same file.
    pub fn for_input(input: &Path, overwrite: bool) -> Result<Self> {
        let stem = input
            .file_stem()
            .ok_or_else(|| Error::UnsupportedPath {
                path: input.to_path_buf(),
            })?
            .to_string_lossy();
        let ext = input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mkv".to_string());

        let in_flight =
            input.with_file_name(format!("{}{}{}.{}", stem, TEMP_MARKER, std::process::id(), ext));
        let destination = if overwrite {
            input.to_path_buf()
        } else {
            output_path(input)?
        };

        Ok(Self {
            in_flight,
            destination,
        })
    }

    /// Move the finished in-flight file to its destination.
    pub fn finalize(&self) -> Result<&Path> {
        debug!(
            "Renaming {} to {}",
            self.in_flight.display(),
            self.destination.display()
        );
        fs::rename(&self.in_flight, &self.destination)?;
        Ok(&self.destination)
    }

    /// Remove a partial in-flight file, if one was written.
    pub fn discard(&self) {
        match fs::remove_file(&self.in_flight) {
            Ok(()) => debug!("Removed partial output {}", self.in_flight.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not remove partial output {}: {}",
                self.in_flight.display(),
                e
            ),
        }
    }
}

/// `<stem>-ac3.<ext>` next to the input.
pub fn output_path(input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| Error::UnsupportedPath {
            path: input.to_path_buf(),
        })?
        .to_string_lossy();
    let file_name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}.mkv", stem, OUTPUT_SUFFIX),
    };
    Ok(input.with_file_name(file_name))
}

/// Whether `path` was produced by this tool, finished or in flight.
pub fn is_generated(path: &Path) -> bool {
    path.file_stem()
        .map(|s| {
            let s = s.to_string_lossy();
            s.ends_with(OUTPUT_SUFFIX) || s.contains(TEMP_MARKER)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_output_path_inserts_suffix() {
        assert_eq!(
            output_path(Path::new("/media/Movie (2001).mkv")).unwrap(),
            PathBuf::from("/media/Movie (2001)-ac3.mkv")
        );
        assert_eq!(
            output_path(Path::new("show.s01e01.mp4")).unwrap(),
            PathBuf::from("show.s01e01-ac3.mp4")
        );
        assert_eq!(
            output_path(Path::new("/media/noext")).unwrap(),
            PathBuf::from("/media/noext-ac3.mkv")
        );
    }

    #[test]
    fn test_paths_for_overwrite() {
        let input = Path::new("/media/movie.mkv");
        let paths = OutputPaths::for_input(input, true).unwrap();
        assert_eq!(paths.destination, input);
        assert_ne!(paths.in_flight, input);
        assert_eq!(paths.in_flight.parent(), input.parent());
        assert_eq!(paths.in_flight.extension().unwrap(), "mkv");

        let paths = OutputPaths::for_input(input, false).unwrap();
        assert_eq!(paths.destination, PathBuf::from("/media/movie-ac3.mkv"));
    }

    #[test]
    fn test_is_generated() {
        assert!(is_generated(Path::new("movie-ac3.mkv")));
        assert!(is_generated(Path::new("movie-ac3-temp-4242.mkv")));
        assert!(!is_generated(Path::new("movie.mkv")));
        assert!(!is_generated(Path::new("ac3-movie.mkv")));
    }

    #[test]
    fn test_finalize_overwrites_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        fs::write(&input, b"original").unwrap();

        let paths = OutputPaths::for_input(&input, true).unwrap();
        fs::write(&paths.in_flight, b"converted").unwrap();
        let dest = paths.finalize().unwrap();

        assert_eq!(dest, input.as_path());
        assert_eq!(fs::read(&input).unwrap(), b"converted");
        assert!(!paths.in_flight.exists());
    }

    #[test]
    fn test_discard_keeps_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("movie.mkv");
        fs::write(&input, b"original").unwrap();

        let paths = OutputPaths::for_input(&input, true).unwrap();
        fs::write(&paths.in_flight, b"partial").unwrap();
        paths.discard();
        paths.discard();

        assert!(!paths.in_flight.exists());
        assert_eq!(fs::read(&input).unwrap(), b"original");
    }
}
