//! Input-injection dispatch for `rdp-agent`'s command channel.
//!
//! Defines the [`sink::InputSink`] capability trait the command loop
//! dispatches onto — the real injection backend is an external
//! collaborator, referenced only by this interface — and the loop itself.

pub mod command_loop;
pub mod sink;

pub use sink::{InputSink, LoggingInputSink};
