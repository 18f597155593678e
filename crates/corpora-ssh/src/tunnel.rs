//! Local-to-remote port forwarding.
//!
//! Makes a service bound to the remote host's loopback (typically MySQL on
//! `127.0.0.1:3306`) reachable on a local ephemeral port.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::{RemoteSession, Result, SessionConfig, SshEndpoint, SshError};

/// An active SSH port forward.
///
/// The local bind port is assigned by the OS at `open` time and stays stable
/// for the handle's lifetime. Dropping the handle stops the forwarding task;
/// prefer [`SshTunnel::close`] for an orderly disconnect.
pub struct SshTunnel {
    session: Arc<RemoteSession>,
    local_port: u16,
    cancel: CancellationToken,
}

impl SshTunnel {
    /// Open a forwarding tunnel through `endpoint`.
    ///
    /// The local side binds `127.0.0.1` on an ephemeral port; the remote
    /// side connects to `(remote_bind_host, remote_bind_port)` as seen from
    /// the remote host.
    pub async fn open(
        endpoint: &SshEndpoint,
        config: &SessionConfig,
        remote_bind_host: &str,
        remote_bind_port: u16,
    ) -> Result<Self> {
        let session = Arc::new(RemoteSession::open(endpoint, config).await?);

        let listener = match TcpListener::bind(("127.0.0.1", 0)).await {
            Ok(listener) => listener,
            Err(e) => {
                session.close().await;
                return Err(SshError::ConnectionFailed(format!(
                    "failed to bind local forward port: {e}"
                )));
            }
        };
        let local_port = match listener.local_addr() {
            Ok(addr) => addr.port(),
            Err(e) => {
                session.close().await;
                return Err(SshError::Io(e));
            }
        };

        info!(
            "tunnel: 127.0.0.1:{} -> {}:{} via {}",
            local_port, remote_bind_host, remote_bind_port, endpoint.host
        );

        let cancel = CancellationToken::new();
        tokio::spawn(run_tunnel(
            listener,
            session.clone(),
            remote_bind_host.to_string(),
            remote_bind_port,
            cancel.clone(),
        ));

        Ok(Self {
            session,
            local_port,
            cancel,
        })
    }

    /// The OS-assigned local port, valid immediately after `open` returns.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && self.session.is_active()
    }

    /// Stop forwarding and disconnect. Safe to call more than once.
    pub async fn close(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.session.close().await;
        info!("tunnel: closed local port {}", self.local_port);
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_tunnel(
    listener: TcpListener,
    session: Arc<RemoteSession>,
    remote_host: String,
    remote_port: u16,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((local_stream, peer)) => {
                    debug!("tunnel: connection from {peer}");
                    let session = session.clone();
                    let remote_host = remote_host.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            forward(local_stream, session, &remote_host, remote_port, cancel).await
                        {
                            warn!("tunnel: forwarding ended with error: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("tunnel: accept failed: {e}");
                }
            },
            _ = cancel.cancelled() => {
                debug!("tunnel: listener stopped");
                break;
            }
        }
    }
}

/// Relay one local connection through a direct-tcpip channel.
async fn forward(
    mut local_stream: TcpStream,
    session: Arc<RemoteSession>,
    remote_host: &str,
    remote_port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    let channel = session.open_forward_channel(remote_host, remote_port).await?;
    let mut remote_stream = channel.into_stream();

    let mut local_buf = [0u8; 8192];
    let mut remote_buf = [0u8; 8192];
    loop {
        tokio::select! {
            n = local_stream.read(&mut local_buf) => match n {
                Ok(0) => break,
                Ok(n) => {
                    if remote_stream.write_all(&local_buf[..n]).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            n = remote_stream.read(&mut remote_buf) => match n {
                Ok(0) => break,
                Ok(n) => {
                    if local_stream.write_all(&remote_buf[..n]).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            _ = cancel.cancelled() => break,
        }
    }

    Ok(())
}
