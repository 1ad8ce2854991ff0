//! Wire framing for `rdp-agent`.
//!
//! Defines the on-wire packet shapes carried by the frame channel
//! (keyframe / delta packets) and the command channel (inbound input
//! commands), plus the pure encode/decode functions for each. Nothing in
//! this crate touches a socket; `rdp-session` and `rdp-capture` own the
//! I/O.

pub mod command;
pub mod packet;

pub use command::{CommandHeader, CommandKind, MouseButton};
pub use packet::{DeltaSlice, ProtoError, SESSION_ID_LEN};
