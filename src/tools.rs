//! External tool detection.

use crate::{Error, Result};
use std::process::Command;

/// Whether `name -version` runs successfully.
pub fn is_installed(name: &str) -> bool {
    Command::new(name)
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Fail unless every named tool is available.
pub fn require_tools(names: &[&str]) -> Result<()> {
    match names.iter().find(|name| !is_installed(name)) {
        Some(missing) => Err(Error::tool_not_found(*missing)),
        None => Ok(()),
    }
}
