//! Capability interfaces for the screen-capture and pointer-position
//! collaborators — external collaborators assumed to return raw pixel
//! buffers for a named rectangle.
//!
//! Kept as narrow traits so the capture loop can be driven in tests by
//! deterministic fakes instead of a real display connection.

use crate::error::CaptureError;
use crate::frame::CapturedFrame;

/// The captured rectangle, in screen pixels. Set once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorRect {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl MonitorRect {
    #[must_use]
    pub fn new(top: u32, left: u32, width: u32, height: u32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }
}

/// Grabs one frame for a given monitor rectangle.
///
/// Implementations are synchronous and potentially blocking (a real
/// backend talks to a compositor or X server); the capture loop runs
/// them inside `spawn_blocking`.
pub trait ScreenCapture: Send + Sync {
    fn capture(&self, rect: MonitorRect) -> Result<CapturedFrame, CaptureError>;

    /// Query the primary monitor's rectangle, captured once at startup
    /// once at startup and reused for every subsequent capture.
    fn primary_monitor(&self) -> Result<MonitorRect, CaptureError>;
}

/// Always fails to capture. The default for headless operation, where
/// no real screen-capture collaborator is wired in. The capture loop
/// treats each failure as transient and keeps retrying.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScreenCapture;

impl ScreenCapture for NullScreenCapture {
    fn capture(&self, _rect: MonitorRect) -> Result<CapturedFrame, CaptureError> {
        Err(CaptureError::Capture(
            "no screen-capture collaborator configured".to_string(),
        ))
    }

    fn primary_monitor(&self) -> Result<MonitorRect, CaptureError> {
        Ok(MonitorRect::new(0, 0, 0, 0))
    }
}

/// Reports the current pointer position in screen coordinates.
pub trait PointerSource: Send + Sync {
    fn position(&self) -> (i32, i32);
}

/// A fixed-at-origin pointer source, useful where no real input
/// collaborator is wired up (headless operation).
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticPointerSource {
    pub x: i32,
    pub y: i32,
}

impl PointerSource for StaticPointerSource {
    fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}
