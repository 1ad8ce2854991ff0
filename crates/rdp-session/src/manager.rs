use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::session::{AgentSession, SessionId, ShutdownWatcher};
use rdp_proto::SESSION_ID_LEN;

const AUTH_PORT: u16 = 8888;
const FRAME_PORT: u16 = 9000;
const COMMAND_PORT: u16 = 9101;
// Port 9100 is declared in legacy code but never used on startup;
// deliberately omitted here.

const USERNAME_FIELD_LEN: usize = 10;
const PASSWORD_FIELD_LEN: usize = 20;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("authentication failed: {0}")]
    AuthFailed(std::io::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Login credentials for the auth channel.
///
/// Defaults match the legacy hardcoded `user1`/`password` pair; a
/// deployment that needs different credentials overrides them via the
/// agent's configuration.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "user1".to_string(),
            password: "password".to_string(),
        }
    }
}

/// UTF-8 encode `s`, truncating or NUL-padding to exactly `len` bytes.
fn fixed_width_bytes(s: &str, len: usize) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.truncate(len);
    bytes.resize(len, 0);
    bytes
}

/// The three fixed ports a [`SessionManager`] connects to. Defaults to
/// the real 8888/9000/9101 triple; tests override them to point at
/// local listeners bound to ephemeral ports.
#[derive(Debug, Clone, Copy)]
struct Ports {
    auth: u16,
    frame: u16,
    command: u16,
}

impl Default for Ports {
    fn default() -> Self {
        Self {
            auth: AUTH_PORT,
            frame: FRAME_PORT,
            command: COMMAND_PORT,
        }
    }
}

/// Performs login and opens the frame/command channels. Does not retry
/// by itself — callers (the reconnect coordinator) own backoff policy.
pub struct SessionManager {
    host: String,
    ports: Ports,
}

impl SessionManager {
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ports: Ports::default(),
        }
    }

    /// As [`SessionManager::new`], but connecting to explicit ports
    /// instead of the real 8888/9000/9101 triple. Lets tests point the
    /// manager at local listeners bound to ephemeral ports.
    #[cfg(test)]
    fn with_ports(host: impl Into<String>, auth: u16, frame: u16, command: u16) -> Self {
        Self {
            host: host.into(),
            ports: Ports { auth, frame, command },
        }
    }

    pub async fn login(&self, creds: &Credentials) -> Result<SessionId, SessionError> {
        let mut sock = TcpStream::connect((self.host.as_str(), self.ports.auth)).await?;
        sock.write_all(&fixed_width_bytes(&creds.username, USERNAME_FIELD_LEN))
            .await?;
        sock.write_all(&fixed_width_bytes(&creds.password, PASSWORD_FIELD_LEN))
            .await?;
        let mut id = [0u8; SESSION_ID_LEN];
        sock.read_exact(&mut id).await.map_err(SessionError::AuthFailed)?;
        // Socket closes here; the auth channel is transient, used only
        // for login.
        Ok(SessionId(id))
    }

    pub async fn connect_frame_channel(&self) -> Result<TcpStream, SessionError> {
        Ok(TcpStream::connect((self.host.as_str(), self.ports.frame)).await?)
    }

    pub async fn connect_command_channel(&self, id: SessionId) -> Result<TcpStream, SessionError> {
        let mut sock = TcpStream::connect((self.host.as_str(), self.ports.command)).await?;
        sock.write_all(&id.bytes()).await?;
        let mut ack = [0u8; 1];
        sock.read_exact(&mut ack).await?;
        Ok(sock)
    }
}

/// Single-flight reconnection: re-runs login, then re-opens the frame
/// and command channels, installing both into the shared [`AgentSession`].
///
/// A concurrent reconnect request while one is in flight is dropped —
/// the caller relies on the attempt already running.
pub struct ReconnectCoordinator {
    lock: Mutex<()>,
}

impl Default for ReconnectCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self { lock: Mutex::new(()) }
    }

    /// Attempt to become the reconnecting task; returns `false`
    /// immediately if another reconnect is already in progress.
    ///
    /// On success, retries login + channel setup with a 5-second
    /// backoff between failures until it succeeds or shutdown is
    /// signaled, then returns `true`.
    pub async fn reconnect(
        &self,
        manager: &SessionManager,
        creds: &Credentials,
        session: &AgentSession,
        shutdown: &ShutdownWatcher,
    ) -> bool {
        let Ok(_guard) = self.lock.try_lock() else {
            tracing::debug!("reconnect already in progress, skipping");
            return false;
        };

        loop {
            if shutdown.is_shutdown() {
                return false;
            }

            match self.attempt(manager, creds, session).await {
                Ok(()) => {
                    tracing::info!("reconnected");
                    return true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reconnect attempt failed");
                }
            }

            if !countdown(RECONNECT_BACKOFF, shutdown).await {
                return false;
            }
        }
    }

    async fn attempt(
        &self,
        manager: &SessionManager,
        creds: &Credentials,
        session: &AgentSession,
    ) -> Result<(), SessionError> {
        let id = manager.login(creds).await?;
        let frame = manager.connect_frame_channel().await?;
        let command = manager.connect_command_channel(id).await?;
        session.set_session_id(id).await;
        session.channels.set_frame(frame).await;
        session.channels.set_command(command).await;
        Ok(())
    }
}

/// Wait out `duration` one second at a time, logging a visible countdown
/// and bailing early if shutdown is signaled mid-wait.
///
/// Returns `true` if the full duration elapsed, `false` if shutdown cut
/// it short.
async fn countdown(duration: Duration, shutdown: &ShutdownWatcher) -> bool {
    let total_secs = duration.as_secs();
    for remaining in (1..=total_secs).rev() {
        if shutdown.is_shutdown() {
            return false;
        }
        tracing::info!(remaining, "reconnecting");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    !shutdown.is_shutdown()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn fixed_width_truncates_and_pads() {
        assert_eq!(fixed_width_bytes("hello", 10), {
            let mut v = b"hello".to_vec();
            v.resize(10, 0);
            v
        });
        assert_eq!(fixed_width_bytes("abcdefghijklmnop", 10), b"abcdefghij".to_vec());
    }

    #[test]
    fn credentials_default_matches_original_client() {
        let creds = Credentials::default();
        assert_eq!(creds.username, "user1");
        assert_eq!(creds.password, "password");
    }

    const FIXED_ID: [u8; SESSION_ID_LEN] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff,
    ];

    #[tokio::test]
    async fn login_returns_session_id_from_auth_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let auth_port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut fields = vec![0u8; USERNAME_FIELD_LEN + PASSWORD_FIELD_LEN];
            sock.read_exact(&mut fields).await.unwrap();
            sock.write_all(&FIXED_ID).await.unwrap();
        });

        let manager = SessionManager::with_ports("127.0.0.1", auth_port, 0, 0);
        let id = manager.login(&Credentials::default()).await.unwrap();

        server.await.unwrap();
        assert_eq!(id, SessionId(FIXED_ID));
    }

    #[tokio::test]
    async fn login_sends_fixed_width_credential_fields() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let auth_port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut fields = vec![0u8; USERNAME_FIELD_LEN + PASSWORD_FIELD_LEN];
            sock.read_exact(&mut fields).await.unwrap();
            sock.write_all(&FIXED_ID).await.unwrap();
            fields
        });

        let manager = SessionManager::with_ports("127.0.0.1", auth_port, 0, 0);
        let creds = Credentials {
            username: "user1".to_string(),
            password: "password".to_string(),
        };
        manager.login(&creds).await.unwrap();

        let sent = server.await.unwrap();
        assert_eq!(&sent[..USERNAME_FIELD_LEN], &fixed_width_bytes("user1", USERNAME_FIELD_LEN)[..]);
        assert_eq!(
            &sent[USERNAME_FIELD_LEN..],
            &fixed_width_bytes("password", PASSWORD_FIELD_LEN)[..]
        );
    }

    #[tokio::test]
    async fn connect_command_channel_sends_session_id_and_awaits_ack() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let command_port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut id = [0u8; SESSION_ID_LEN];
            sock.read_exact(&mut id).await.unwrap();
            sock.write_all(&[1u8]).await.unwrap();
            id
        });

        let manager = SessionManager::with_ports("127.0.0.1", 0, 0, command_port);
        manager
            .connect_command_channel(SessionId(FIXED_ID))
            .await
            .unwrap();

        let received_id = server.await.unwrap();
        assert_eq!(received_id, FIXED_ID);
    }
}
