//! The command loop: reads inbound command packets from the command
//! channel and dispatches them to an [`InputSink`].

use std::sync::Arc;
use std::time::Duration;

use rdp_proto::command::{decode_command, parse_header, CommandKind, HEADER_LEN};
use rdp_session::{AgentSession, Credentials, ReconnectCoordinator, SessionManager, ShutdownWatcher};

use crate::sink::InputSink;

const RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Run the command loop until shutdown is signaled.
///
/// Each iteration reads the fixed 24-byte header, then exactly
/// `body_size` bytes for the body, decodes it, and dispatches.
/// Unknown command types are logged and their (already-consumed) body
/// discarded without dispatch — the body-size field lets the reader
/// skip them without per-type knowledge. Any channel error triggers
/// reconnection and a 3-second pause before resuming.
pub async fn run<I: InputSink>(
    sink: I,
    session: AgentSession,
    manager: Arc<SessionManager>,
    creds: Credentials,
    reconnect: Arc<ReconnectCoordinator>,
    mut shutdown: ShutdownWatcher,
) {
    loop {
        if shutdown.is_shutdown() {
            return;
        }

        match read_and_dispatch(&sink, &session).await {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!(error = %e, "command channel error");
                reconnect.reconnect(&manager, &creds, &session, &shutdown).await;
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
        }
    }
}

async fn read_and_dispatch<I: InputSink>(
    sink: &I,
    session: &AgentSession,
) -> Result<(), rdp_session::ChannelError> {
    let header_bytes = session.channels.read_command_header(HEADER_LEN).await?;
    let header = match parse_header(&header_bytes) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(error = %e, "malformed command header");
            return Ok(());
        }
    };

    let body = session
        .channels
        .read_command_body(header.body_size as usize)
        .await?;

    tracing::info!(controller = %hex_id(&header.controller_id), "command from controller");

    match decode_command(header.cmd_type, &body) {
        Ok(kind) => dispatch(sink, session, kind),
        Err(e) => tracing::warn!(error = %e, cmd_type = header.cmd_type, "malformed command body"),
    }

    Ok(())
}

/// Render a 16-byte controller id as a compact hex string for logging,
/// without pulling in a UUID formatting dependency for this crate.
fn hex_id(id: &[u8; 16]) -> String {
    id.iter().map(|b| format!("{b:02x}")).collect()
}

fn dispatch<I: InputSink>(sink: &I, session: &AgentSession, kind: CommandKind) {
    match kind {
        CommandKind::MovePointer { x, y } => sink.move_to(x, y),
        CommandKind::Press { button, x, y } => sink.press(button, x, y),
        CommandKind::Release { button, x, y } => sink.release(button, x, y),
        CommandKind::DoubleClick { button, x, y } => sink.double_click(button, x, y),
        CommandKind::Scroll { x, y, amount } => sink.scroll(x, y, amount),
        CommandKind::SetStreaming(streaming) => {
            tracing::info!(streaming, "streaming gate toggled");
            session.gate.set(streaming);
        }
        CommandKind::Unknown(cmd_type) => {
            tracing::warn!(cmd_type, "unknown command type, body discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    impl InputSink for RecordingSink {
        fn move_to(&self, x: i32, y: i32) {
            self.calls.lock().unwrap().push(format!("move_to({x},{y})"));
        }
        fn press(&self, button: rdp_proto::MouseButton, x: i32, y: i32) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("press({button:?},{x},{y})"));
        }
        fn release(&self, button: rdp_proto::MouseButton, x: i32, y: i32) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("release({button:?},{x},{y})"));
        }
        fn double_click(&self, button: rdp_proto::MouseButton, x: i32, y: i32) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("double_click({button:?},{x},{y})"));
        }
        fn scroll(&self, x: i32, y: i32, amount: i32) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("scroll({x},{y},{amount})"));
        }
    }

    #[test]
    fn move_command_dispatches_to_sink() {
        let sink = RecordingSink::default();
        let (session, _watcher) = AgentSession::new();
        dispatch(&sink, &session, CommandKind::MovePointer { x: 500, y: 200 });
        assert_eq!(sink.calls.lock().unwrap().as_slice(), ["move_to(500,200)"]);
    }

    #[test]
    fn gate_commands_toggle_session_gate_without_touching_sink() {
        let sink = RecordingSink::default();
        let (session, _watcher) = AgentSession::new();
        assert!(!session.gate.is_streaming());

        dispatch(&sink, &session, CommandKind::SetStreaming(true));
        assert!(session.gate.is_streaming());

        dispatch(&sink, &session, CommandKind::SetStreaming(false));
        assert!(!session.gate.is_streaming());

        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_command_does_not_dispatch() {
        let sink = RecordingSink::default();
        let (session, _watcher) = AgentSession::new();
        dispatch(&sink, &session, CommandKind::Unknown(99));
        assert!(sink.calls.lock().unwrap().is_empty());
    }
}
