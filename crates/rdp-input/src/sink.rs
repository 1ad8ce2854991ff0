//! The input-injection capability interface.
//!
//! The local input-injection facility is an external collaborator —
//! assumed to move the pointer, press/release buttons, scroll. This
//! module defines the narrow trait the command loop dispatches onto
//! and a logging stub suitable for headless operation and tests.

use rdp_proto::MouseButton;

/// Replays decoded pointer events on the local input subsystem.
pub trait InputSink: Send + Sync {
    fn move_to(&self, x: i32, y: i32);
    fn press(&self, button: MouseButton, x: i32, y: i32);
    fn release(&self, button: MouseButton, x: i32, y: i32);
    fn double_click(&self, button: MouseButton, x: i32, y: i32);
    fn scroll(&self, x: i32, y: i32, amount: i32);
}

/// Logs every event instead of injecting it. The default for headless
/// operation and the implementation exercised by the command-loop
/// tests, which need a deterministic fake rather than a real injection
/// backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInputSink;

impl InputSink for LoggingInputSink {
    fn move_to(&self, x: i32, y: i32) {
        tracing::debug!(x, y, "move_to");
    }

    fn press(&self, button: MouseButton, x: i32, y: i32) {
        tracing::debug!(?button, x, y, "press");
    }

    fn release(&self, button: MouseButton, x: i32, y: i32) {
        tracing::debug!(?button, x, y, "release");
    }

    fn double_click(&self, button: MouseButton, x: i32, y: i32) {
        tracing::debug!(?button, x, y, "double_click");
    }

    fn scroll(&self, x: i32, y: i32, amount: i32) {
        tracing::debug!(x, y, amount, "scroll");
    }
}
