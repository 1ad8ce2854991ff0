use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use rdp_proto::SESSION_ID_LEN;

use crate::channels::Channels;

/// The 128-bit opaque token issued by the auth endpoint.
///
/// Prefixed to every frame packet and used to register the command
/// channel. Formatted like the source's `uuid.UUID` for log readability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub [u8; SESSION_ID_LEN]);

impl SessionId {
    #[must_use]
    pub fn bytes(self) -> [u8; SESSION_ID_LEN] {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_bytes(self.0))
    }
}

/// The `streaming` signal toggled by command types 20/21.
///
/// Lock-free: read on every capture iteration, written only from the
/// command task.
#[derive(Clone, Default)]
pub struct Gate {
    streaming: Arc<AtomicBool>,
}

impl Gate {
    #[must_use]
    pub fn new(initial: bool) -> Self {
        Self {
            streaming: Arc::new(AtomicBool::new(initial)),
        }
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    pub fn set(&self, streaming: bool) {
        self.streaming.store(streaming, Ordering::Release);
    }
}

/// The writer half of the process-wide shutdown signal.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn new() -> (Self, ShutdownWatcher) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, ShutdownWatcher { rx })
    }

    /// Trigger shutdown. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }

    #[must_use]
    pub fn watcher(&self) -> ShutdownWatcher {
        ShutdownWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

/// The reader half, cloned into the capture and command tasks.
#[derive(Clone)]
pub struct ShutdownWatcher {
    rx: watch::Receiver<bool>,
}

impl ShutdownWatcher {
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been signaled; resolves immediately if
    /// it already has been.
    pub async fn wait_for_shutdown(&mut self) {
        if self.is_shutdown() {
            return;
        }
        // A send error means the sender was dropped, which only happens
        // alongside process teardown; treat it the same as shutdown.
        let _ = self.rx.wait_for(|shutdown| *shutdown).await;
    }
}

/// The session-scoped state shared by the capture and command tasks.
///
/// This is the single owned value used in place of process-wide booleans
/// and locks: the session id, the three channels,
/// the streaming gate, and the shutdown signal all live here.
#[derive(Clone)]
pub struct AgentSession {
    id: Arc<RwLock<Option<SessionId>>>,
    pub gate: Gate,
    pub channels: Channels,
    shutdown: ShutdownSignal,
}

impl AgentSession {
    #[must_use]
    pub fn new() -> (Self, ShutdownWatcher) {
        let (shutdown, watcher) = ShutdownSignal::new();
        (
            Self {
                id: Arc::new(RwLock::new(None)),
                gate: Gate::new(false),
                channels: Channels::new(),
                shutdown,
            },
            watcher,
        )
    }

    pub async fn session_id(&self) -> Option<SessionId> {
        *self.id.read().await
    }

    pub async fn set_session_id(&self, id: SessionId) {
        *self.id.write().await = Some(id);
    }

    #[must_use]
    pub fn shutdown_watcher(&self) -> ShutdownWatcher {
        self.shutdown.watcher()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_defaults_to_idle() {
        let gate = Gate::default();
        assert!(!gate.is_streaming());
        gate.set(true);
        assert!(gate.is_streaming());
    }

    #[tokio::test]
    async fn shutdown_watcher_observes_signal() {
        let (signal, mut watcher) = ShutdownSignal::new();
        assert!(!watcher.is_shutdown());
        signal.shutdown();
        watcher.wait_for_shutdown().await;
        assert!(watcher.is_shutdown());
    }

    #[test]
    fn session_id_displays_as_uuid() {
        let id = SessionId([
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ]);
        assert_eq!(id.to_string(), "00112233-4455-6677-8899-aabbccddeeff");
    }
}
