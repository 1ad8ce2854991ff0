use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

mod config;
mod error;
mod resources;
mod tray;

use tray::TrayPresence;

/// Client agent for the remote-desktop control service.
///
/// Captures the primary display, streams full or delta frames to a
/// collection server, and replays inbound input commands issued by a
/// remote controller.
#[derive(Parser, Debug)]
#[command(name = "rdp-agent", version, about)]
struct Cli {
    /// Server host shared by the auth, frame, and command endpoints.
    /// Ports are fixed: 8888 (auth), 9000 (frame), 9101 (command).
    #[arg(long, short, default_value = "127.0.0.1")]
    server: String,

    /// Log level, used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Path to an optional TOML configuration file (capture cadence,
    /// degradation thresholds).
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let file_cfg = config::load(cli.config.as_deref())?;

    // Bundled resources are fatal if missing. Decoding the cursor
    // overlay into pixels uses the `image` crate the same way slice
    // encoding does; the PNG codec itself is the external-collaborator
    // boundary, not the byte-reading step.
    resources::read("computer.png").context("loading tray icon resource")?;
    let cursor_bytes =
        resources::read("curser_point.png").context("loading cursor overlay resource")?;
    let cursor_rgba = image::load_from_memory(&cursor_bytes)
        .context("decoding cursor overlay resource")?
        .to_rgba8();
    let cursor = rdp_capture::CursorBitmap {
        width: cursor_rgba.width(),
        height: cursor_rgba.height(),
        rgba: cursor_rgba.into_raw(),
    };

    tracing::info!(server = %cli.server, "starting rdp-agent");

    let (session, _watcher_at_construction) = rdp_session::AgentSession::new();
    let manager = Arc::new(rdp_session::SessionManager::new(cli.server.clone()));
    let creds = rdp_session::Credentials::default();
    let reconnect = Arc::new(rdp_session::ReconnectCoordinator::new());

    // The initial connect is just the first reconnect attempt: login,
    // then open the frame and command channels, retrying with the
    // usual 5-second backoff until it succeeds or shutdown is signaled.
    tracing::info!("connecting to collection server");
    if !reconnect
        .reconnect(&manager, &creds, &session, &session.shutdown_watcher())
        .await
    {
        tracing::warn!("shutdown requested before initial connection completed");
        return Ok(());
    }

    let screen_capture = rdp_capture::NullScreenCapture;
    let rect = screen_capture
        .primary_monitor()
        .unwrap_or_else(|_| rdp_capture::MonitorRect::new(0, 0, 0, 0));

    let collaborators = rdp_capture::CaptureCollaborators {
        capture: screen_capture,
        pointer: rdp_capture::StaticPointerSource::default(),
        compositor: rdp_capture::AlphaBlendCompositor,
        cursor,
        rect,
    };
    let encoder = rdp_capture::DeltaEncoder::with_thresholds(
        rdp_capture::PngSliceEncoder,
        file_cfg.capture.thresholds(),
    );

    let capture_fut = rdp_capture::capture_loop::run(
        collaborators,
        encoder,
        session.clone(),
        Arc::clone(&manager),
        creds.clone(),
        Arc::clone(&reconnect),
        session.shutdown_watcher(),
    );

    let command_fut = rdp_input::command_loop::run(
        rdp_input::LoggingInputSink,
        session.clone(),
        Arc::clone(&manager),
        creds.clone(),
        Arc::clone(&reconnect),
        session.shutdown_watcher(),
    );

    tokio::spawn(rdp_session::Supervisor::run(capture_fut, command_fut));

    let tray_watcher = session.shutdown_watcher();
    tokio::spawn(async move { tray::NullTray.run(tray_watcher).await });

    wait_for_shutdown_signal(&session).await;

    Ok(())
}

/// The real "Exit" trigger for this headless build: SIGINT or SIGTERM
/// sets the shutdown signal and closes all sockets, the same effect
/// the tray's "Exit" menu item has.
async fn wait_for_shutdown_signal(session: &rdp_session::AgentSession) {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }

    session.request_shutdown();
    session.channels.close_all().await;
}
