//! Finding candidate media files.

use crate::output::is_generated;
use crate::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const DEFAULT_EXTENSIONS: &[&str] = &["mkv", "mp4", "m4v", "avi"];

/// Depth-first walk over a set of files and directories.
///
/// Files named directly are always yielded. Directories contribute media
/// files matching the extension list, in file name order; subdirectories are
/// entered only when recursive. Files produced by this tool are skipped.
/// The walk is lazy and can be restarted by calling [`MediaWalker::iter`]
/// again.
#[derive(Debug, Clone)]
pub struct MediaWalker {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
    recursive: bool,
}

impl MediaWalker {
    pub fn new(roots: Vec<PathBuf>, extensions: &[String]) -> Self {
        Self {
            roots,
            extensions: extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            recursive: false,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<PathBuf>> + '_ {
        self.roots.iter().flat_map(move |root| self.walk_root(root))
    }

    fn walk_root<'a>(&'a self, root: &'a Path) -> Box<dyn Iterator<Item = Result<PathBuf>> + 'a> {
        if root.is_file() {
            return Box::new(std::iter::once(Ok(root.to_path_buf())));
        }
        if !root.is_dir() {
            return Box::new(std::iter::once(Err(Error::UnsupportedPath {
                path: root.to_path_buf(),
            })));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let entries = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(move |path| self.is_media(path) && !is_generated(path))
            .map(Ok);
        Box::new(entries)
    }

    fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}

/// Drain a walk into unique candidate files.
///
/// A file reachable through several roots is processed once, so no two
/// transcodes ever share an input. Unsupported paths are logged and counted.
pub fn collect_candidates(walker: &MediaWalker) -> (Vec<PathBuf>, usize) {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut unsupported = 0;

    for candidate in walker.iter() {
        match candidate {
            Ok(path) => {
                let key = path.canonicalize().unwrap_or_else(|_| path.clone());
                if seen.insert(key) {
                    files.push(path);
                } else {
                    debug!("Ignoring duplicate {}", path.display());
                }
            }
            Err(e) => {
                warn!("Skipping {}", e);
                unsupported += 1;
            }
        }
    }

    (files, unsupported)
}
