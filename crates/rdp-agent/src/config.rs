//! Agent configuration: CLI flags merged with an optional TOML file.
//!
//! Defaults, `#[serde(default)]`, load-if-present. When no file is
//! present, every field falls
//! back to the delta encoder's own default thresholds, so behavior is
//! unchanged out of the box.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use rdp_capture::DegradationThresholds;

/// The file-backed half of the agent's configuration. CLI flags for
/// `--server`/`--log-level` are kept on
/// [`crate::Cli`] and merged in by the caller; this struct only covers
/// settings with no CLI equivalent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub capture: CaptureConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
        }
    }
}

/// Degradation thresholds for the delta encoder. Defaults match
/// [`DegradationThresholds::default`] exactly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Per-pixel grayscale difference above which a pixel counts as dirty.
    pub diff_threshold: u8,
    /// Minimum milliseconds between keyframes.
    pub keyframe_interval_ms: u64,
    /// Above this many dirty regions, fall back to a keyframe.
    pub max_contours: usize,
    /// Above this fraction of the frame's raw pixel volume covered by
    /// dirty slices, fall back to a keyframe.
    pub max_volume_ratio: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let defaults = DegradationThresholds::default();
        Self {
            diff_threshold: defaults.diff_threshold,
            keyframe_interval_ms: defaults.keyframe_interval.as_millis() as u64,
            max_contours: defaults.max_contours,
            max_volume_ratio: defaults.max_volume_ratio,
        }
    }
}

impl CaptureConfig {
    #[must_use]
    pub fn thresholds(&self) -> DegradationThresholds {
        DegradationThresholds {
            diff_threshold: self.diff_threshold,
            keyframe_interval: std::time::Duration::from_millis(self.keyframe_interval_ms),
            max_contours: self.max_contours,
            max_volume_ratio: self.max_volume_ratio,
        }
    }
}

/// Load the agent's file configuration from `path`, or fall back to
/// defaults if `path` is `None` or the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    if !path.exists() {
        tracing::debug!(?path, "agent config not found, using defaults");
        return Ok(FileConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read agent config: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse agent config: {}", path.display()))?;

    tracing::info!(?path, "agent configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_degradation_thresholds_default() {
        let cfg = CaptureConfig::default();
        assert_eq!(cfg.diff_threshold, 30);
        assert_eq!(cfg.keyframe_interval_ms, 1000);
        assert_eq!(cfg.max_contours, 3000);
        assert!((cfg.max_volume_ratio - 0.90).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_path_falls_back_to_defaults() {
        let cfg = load(None).unwrap();
        assert_eq!(cfg.capture.diff_threshold, 30);
    }
}
