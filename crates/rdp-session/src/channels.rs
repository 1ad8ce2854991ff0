use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel not connected")]
    NotConnected,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The frame and command TCP channels, each owned by exactly one task
/// (capture writes the frame channel, command reads the command
/// channel) but stored here so reconnection can replace either without
/// the owning task needing to know it happened.
#[derive(Clone)]
pub struct Channels {
    frame: Arc<Mutex<Option<TcpStream>>>,
    command: Arc<Mutex<Option<TcpStream>>>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frame: Arc::new(Mutex::new(None)),
            command: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn set_frame(&self, stream: TcpStream) {
        *self.frame.lock().await = Some(stream);
    }

    pub async fn set_command(&self, stream: TcpStream) {
        *self.command.lock().await = Some(stream);
    }

    /// Write one complete frame-channel packet.
    ///
    /// A partial write is treated as a broken channel: the stored
    /// stream is dropped so the next packet attempt (and the caller's
    /// reconnect request) starts from a clean slate.
    pub async fn write_frame_packet(&self, bytes: &[u8]) -> Result<(), ChannelError> {
        let mut guard = self.frame.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(ChannelError::NotConnected);
        };
        match stream.write_all(bytes).await {
            Ok(()) => Ok(()),
            Err(e) => {
                *guard = None;
                Err(e.into())
            }
        }
    }

    /// Read the fixed-length command header (24 bytes).
    pub async fn read_command_header(&self, len: usize) -> Result<Vec<u8>, ChannelError> {
        self.read_command_exact(len).await
    }

    /// Read a command body of the length declared in its header.
    pub async fn read_command_body(&self, len: usize) -> Result<Vec<u8>, ChannelError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        self.read_command_exact(len).await
    }

    async fn read_command_exact(&self, len: usize) -> Result<Vec<u8>, ChannelError> {
        let mut guard = self.command.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(ChannelError::NotConnected);
        };
        let mut buf = vec![0u8; len];
        match stream.read_exact(&mut buf).await {
            Ok(_) => Ok(buf),
            Err(e) => {
                *guard = None;
                Err(e.into())
            }
        }
    }

    /// Drop both stored streams, closing the sockets.
    pub async fn close_all(&self) {
        *self.frame.lock().await = None;
        *self.command.lock().await = None;
    }
}
