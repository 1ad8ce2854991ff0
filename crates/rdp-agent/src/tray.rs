//! System-tray presence: a single icon with one menu item, "Exit",
//! whose activation sets the shutdown signal and closes sockets. The
//! tray facility itself is an external collaborator; this module only
//! defines the capability interface and a non-functional stub, run as
//! a short-lived auxiliary task.
//!
//! In this headless build the same effect (shutdown + socket close) is
//! reached through process signals instead (see `main`'s SIGINT/SIGTERM
//! handling), which is the real "Exit" trigger until a tray backend is
//! wired in.

use async_trait::async_trait;

use rdp_session::ShutdownWatcher;

#[async_trait]
pub trait TrayPresence: Send + Sync {
    /// Run the tray's event loop until shutdown is observed.
    async fn run(&self, shutdown: ShutdownWatcher);
}

/// Never activates anything; idles until shutdown. The default when no
/// real tray backend is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTray;

#[async_trait]
impl TrayPresence for NullTray {
    async fn run(&self, mut shutdown: ShutdownWatcher) {
        shutdown.wait_for_shutdown().await;
    }
}
