//! Bundled resource lookup: `computer.png` (tray icon) and
//! `curser_point.png` (cursor overlay). Resolution tries the current
//! directory first, then falls back to `./_internal/icon/`, matching
//! the legacy client's `initCurser`/`initMenu`. Missing resources are
//! fatal at startup.
//!
//! Decoding the located bytes into pixels is the image codec's job,
//! an external collaborator; this module only resolves paths and reads
//! bytes.

use std::path::{Path, PathBuf};

use crate::error::AgentError;

const FALLBACK_DIR: &str = "./_internal/icon/";

/// Locate a bundled resource by name, trying the working directory
/// first and then the fallback directory.
pub fn locate(name: &str) -> Result<PathBuf, AgentError> {
    locate_under(Path::new("."), name)
}

/// As [`locate`], but rooted at `base` instead of the process's actual
/// working directory — lets tests avoid mutating global process state.
fn locate_under(base: &Path, name: &str) -> Result<PathBuf, AgentError> {
    let direct = base.join(name);
    if direct.is_file() {
        return Ok(direct);
    }

    let fallback = base.join(FALLBACK_DIR).join(name);
    if fallback.is_file() {
        return Ok(fallback);
    }

    Err(AgentError::ResourceMissing(name.to_string()))
}

/// Locate and read a bundled resource's raw bytes.
pub fn read(name: &str) -> Result<Vec<u8>, AgentError> {
    let path = locate(name)?;
    std::fs::read(&path).map_err(|_| AgentError::ResourceMissing(name.to_string()))
}
