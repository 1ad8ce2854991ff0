//! The capture loop: grabs a frame, composites the cursor, runs it
//! through the delta encoder, and writes the resulting packet to the
//! frame channel. Gated by [`rdp_session::Gate`].
//!
//! Capture, compositing, and PNG encoding are CPU-bound, so the whole
//! step runs inside `spawn_blocking` — the command task must not share
//! a worker with a long capture encode.

use std::sync::Arc;
use std::time::Duration;

use rdp_proto::packet::{encode_delta, encode_keyframe};
use rdp_session::{AgentSession, Credentials, ReconnectCoordinator, SessionManager, ShutdownWatcher};

use crate::compositor::{CursorBitmap, CursorCompositor};
use crate::delta::{DeltaEncoder, DeltaResult};
use crate::error::CaptureError;
use crate::slice_encoder::SliceEncoder;
use crate::source::{MonitorRect, PointerSource, ScreenCapture};

const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// The out-of-scope collaborators the capture loop drives: a screen
/// grab source, a pointer-position source, and a cursor compositor.
pub struct CaptureCollaborators<C, P, X> {
    pub capture: C,
    pub pointer: P,
    pub compositor: X,
    pub cursor: CursorBitmap,
    pub rect: MonitorRect,
}

/// Run the capture loop until shutdown is signaled.
///
/// On any capture/I/O error the loop invalidates the encoder's
/// `prev_gray`, asks the reconnect coordinator to re-establish
/// connectivity, and waits 3 seconds before resuming. A PNG-encoding
/// failure on an otherwise-good frame is treated more gently: the frame
/// is skipped and `prev_gray` invalidated, but no reconnection is
/// requested.
#[allow(clippy::too_many_arguments)]
pub async fn run<C, P, X, E>(
    collab: CaptureCollaborators<C, P, X>,
    mut encoder: DeltaEncoder<E>,
    session: AgentSession,
    manager: Arc<SessionManager>,
    creds: Credentials,
    reconnect: Arc<ReconnectCoordinator>,
    mut shutdown: ShutdownWatcher,
) where
    C: ScreenCapture + 'static,
    P: PointerSource + 'static,
    X: CursorCompositor + 'static,
    E: SliceEncoder + 'static,
{
    let collab = Arc::new(collab);

    loop {
        if shutdown.is_shutdown() {
            return;
        }

        if !session.gate.is_streaming() {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            continue;
        }

        let collab_for_task = Arc::clone(&collab);
        let task = tokio::task::spawn_blocking(move || {
            let mut enc = encoder;
            let result = capture_and_encode(&collab_for_task, &mut enc);
            (enc, result)
        });

        let (enc_back, result) = match task.await {
            Ok(pair) => pair,
            Err(join_err) => {
                tracing::error!(error = %join_err, "capture task panicked; requesting shutdown");
                session.request_shutdown();
                return;
            }
        };
        encoder = enc_back;

        match result {
            Ok(DeltaResult::Empty) => {}
            Ok(DeltaResult::Keyframe { body, width, height }) => {
                handle_packet(
                    &session,
                    &manager,
                    &creds,
                    &reconnect,
                    &mut shutdown,
                    &mut encoder,
                    |id| encode_keyframe(id, width, height, &body),
                )
                .await;
            }
            Ok(DeltaResult::Delta { slices }) => {
                handle_packet(
                    &session,
                    &manager,
                    &creds,
                    &reconnect,
                    &mut shutdown,
                    &mut encoder,
                    |id| encode_delta(id, &slices),
                )
                .await;
            }
            Err(CaptureError::Encode(msg)) => {
                tracing::warn!(error = %msg, "frame encode failed, skipping frame");
                encoder.invalidate();
            }
            Err(e) => {
                tracing::warn!(error = %e, "capture failed");
                encoder.invalidate();
                reconnect.reconnect(&manager, &creds, &session, &shutdown).await;
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
        }
    }
}

fn capture_and_encode<C, P, X, E>(
    collab: &CaptureCollaborators<C, P, X>,
    encoder: &mut DeltaEncoder<E>,
) -> Result<DeltaResult, CaptureError>
where
    C: ScreenCapture,
    P: PointerSource,
    X: CursorCompositor,
    E: SliceEncoder,
{
    let mut frame = collab.capture.capture(collab.rect)?;
    let pos = collab.pointer.position();
    collab.compositor.composite(&mut frame, &collab.cursor, pos);
    encoder.encode(&frame)
}

/// Write one packet built by `build` and update encoder state
/// accordingly: commit `prev_gray` on success, invalidate and
/// reconnect on a channel write failure.
async fn handle_packet<E: SliceEncoder>(
    session: &AgentSession,
    manager: &Arc<SessionManager>,
    creds: &Credentials,
    reconnect: &Arc<ReconnectCoordinator>,
    shutdown: &mut ShutdownWatcher,
    encoder: &mut DeltaEncoder<E>,
    build: impl FnOnce([u8; rdp_proto::SESSION_ID_LEN]) -> bytes::Bytes,
) {
    let Some(id) = session.session_id().await else {
        tracing::warn!("no active session id, dropping frame");
        encoder.invalidate();
        return;
    };

    let packet = build(id.bytes());
    match session.channels.write_frame_packet(&packet).await {
        Ok(()) => encoder.commit(),
        Err(e) => {
            tracing::warn!(error = %e, "frame channel write failed");
            encoder.invalidate();
            reconnect.reconnect(manager, creds, session, shutdown).await;
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }
}
