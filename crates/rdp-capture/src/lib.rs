//! Frame differencing and the capture loop for `rdp-agent`.
//!
//! Holds the plain pixel-buffer [`frame::CapturedFrame`] type, the
//! [`delta::DeltaEncoder`] (grayscale diffing, contour approximation,
//! degradation rules), PNG slice encoding, and the capture loop that
//! ties a screen-capture collaborator to the frame channel.

pub mod capture_loop;
pub mod compositor;
pub mod delta;
pub mod error;
pub mod frame;
pub mod slice_encoder;
pub mod source;

pub use capture_loop::CaptureCollaborators;
pub use compositor::{AlphaBlendCompositor, CursorBitmap, CursorCompositor, NoOpCompositor};
pub use delta::{DegradationThresholds, DeltaEncoder, DeltaResult};
pub use error::CaptureError;
pub use frame::{CapturedFrame, GrayFrame, PixelFormat, Rect};
pub use slice_encoder::{PngSliceEncoder, SliceEncoder};
pub use source::{MonitorRect, NullScreenCapture, PointerSource, ScreenCapture, StaticPointerSource};
