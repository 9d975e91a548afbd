//! Error types for ac3_enc.

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning or transcoding a file.
///
/// None of these abort a batch; the processor logs them and moves on to the
/// next file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file could not be probed (unreadable, or not a media container).
    #[error("failed to probe {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// The path is neither a regular file nor a directory.
    #[error("unsupported path: {}", path.display())]
    UnsupportedPath { path: PathBuf },

    /// The transcoder failed. The input file is left untouched.
    #[error("transcode of {} failed: {message}", path.display())]
    Transcode { path: PathBuf, message: String },

    /// The transcode was cancelled by the user.
    #[error("transcode of {} cancelled", path.display())]
    Cancelled { path: PathBuf },

    /// The transcode ran longer than the configured limit.
    #[error("transcode of {} timed out after {}s", path.display(), timeout.as_secs())]
    TimedOut { path: PathBuf, timeout: Duration },

    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a probe error.
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a transcode error.
    pub fn transcode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Transcode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }
}
