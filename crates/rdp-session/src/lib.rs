//! Session lifecycle for `rdp-agent`.
//!
//! Owns the three TCP endpoints (auth, frame, command), the login
//! handshake, the single-flight reconnection coordinator, and the
//! `streaming` gate. Modeled as one explicitly owned [`AgentSession`]
//! value shared by the capture and command tasks, rather than as
//! process-wide globals.

pub mod channels;
pub mod manager;
pub mod session;
pub mod supervisor;

pub use channels::{ChannelError, Channels};
pub use manager::{Credentials, ReconnectCoordinator, SessionError, SessionManager};
pub use session::{AgentSession, Gate, SessionId, ShutdownSignal, ShutdownWatcher};
pub use supervisor::Supervisor;
