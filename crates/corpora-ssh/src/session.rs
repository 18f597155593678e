//! SSH control connection: command execution and liveness checks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use russh::client;
use russh::{ChannelMsg, Disconnect};
use russh_keys::key;
use tokio::time::timeout;

use crate::{Result, SessionConfig, SshEndpoint, SshError};

/// Captured streams of one finished remote command.
#[derive(Debug, Default)]
pub struct CommandOutput {
    /// Exit status reported by the remote shell, if any arrived before the
    /// channel closed.
    pub exit_status: Option<u32>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// Client handler that trusts unknown host keys.
///
/// The corpus hosts are provisioned machines reached over a private network;
/// auto-accepting their keys is a deliberate policy of this pipeline, logged
/// at warn level so it stays visible in operation.
struct TrustingClient {
    host: String,
    port: u16,
}

#[async_trait]
impl client::Handler for TrustingClient {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        warn!(
            "SSH: accepting host key for {}:{} without verification",
            self.host, self.port
        );
        Ok(true)
    }
}

/// One SSH control connection.
///
/// Exclusively owns the underlying transport; dependent channels (SFTP data
/// channel, forwarded ports) must not outlive it.
pub struct RemoteSession {
    handle: client::Handle<TrustingClient>,
    config: SessionConfig,
    closed: AtomicBool,
}

impl RemoteSession {
    /// Establish and authenticate the control connection.
    pub async fn open(endpoint: &SshEndpoint, config: &SessionConfig) -> Result<Self> {
        info!(
            "SSH: connecting to {}@{}:{}",
            endpoint.username, endpoint.host, endpoint.port
        );

        let ssh_config = Arc::new(client::Config::default());
        let client = TrustingClient {
            host: endpoint.host.clone(),
            port: endpoint.port,
        };

        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let mut handle = timeout(
            connect_timeout,
            client::connect(ssh_config, (endpoint.host.as_str(), endpoint.port), client),
        )
        .await
        .map_err(|_| {
            SshError::ConnectionFailed(format!(
                "connection to {}:{} timed out after {}s",
                endpoint.host, endpoint.port, config.connect_timeout_secs
            ))
        })?
        .map_err(|e| SshError::ConnectionFailed(e.to_string()))?;

        let authenticated = if let Some(password) = &endpoint.password {
            debug!("SSH: authenticating with password");
            timeout(
                connect_timeout,
                handle.authenticate_password(&endpoint.username, password),
            )
            .await
            .map_err(|_| SshError::AuthenticationFailed("authentication timed out".to_string()))?
            .map_err(|e| SshError::AuthenticationFailed(e.to_string()))?
        } else if let Some(key_pem) = &endpoint.private_key {
            debug!("SSH: authenticating with private key");
            let passphrase = endpoint.private_key_passphrase.as_deref();
            let key_pair = russh_keys::decode_secret_key(key_pem, passphrase)
                .map_err(|e| SshError::AuthenticationFailed(format!("invalid private key: {e}")))?;
            timeout(
                connect_timeout,
                handle.authenticate_publickey(&endpoint.username, Arc::new(key_pair)),
            )
            .await
            .map_err(|_| SshError::AuthenticationFailed("authentication timed out".to_string()))?
            .map_err(|e| SshError::AuthenticationFailed(e.to_string()))?
        } else {
            return Err(SshError::AuthenticationFailed(
                "no password or private key configured".to_string(),
            ));
        };

        if !authenticated {
            return Err(SshError::AuthenticationFailed(format!(
                "server rejected credentials for {}",
                endpoint.username
            )));
        }

        info!(
            "SSH: session established with {}:{}",
            endpoint.host, endpoint.port
        );
        Ok(Self {
            handle,
            config: config.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Whether the underlying transport is still usable.
    pub fn is_active(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.handle.is_closed()
    }

    /// Run a shell command on the remote host and capture its streams.
    ///
    /// This is the single point where the crate hands text to the remote
    /// shell. Callers interpolating values into `command` must quote them
    /// with [`shell_quote`](crate::shell_quote); nothing is sanitized here.
    pub async fn execute(&self, command: &str) -> Result<CommandOutput> {
        debug!("SSH: exec: {command}");
        let deadline = Duration::from_secs(self.config.command_timeout_secs);
        timeout(deadline, self.execute_inner(command))
            .await
            .map_err(|_| SshError::CommandTimeout(self.config.command_timeout_secs))?
    }

    async fn execute_inner(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SshError::ChannelFailed(e.to_string()))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| SshError::ChannelFailed(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data.as_ref()),
                ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                    stderr.extend_from_slice(data.as_ref())
                }
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        Ok(CommandOutput {
            exit_status,
            stdout: lines(&stdout),
            stderr: lines(&stderr),
        })
    }

    /// Open the secondary channel used for bulk file copy, bound to this
    /// session's transport.
    pub async fn open_subsystem_channel(
        &self,
        name: &str,
    ) -> Result<russh::Channel<client::Msg>> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SshError::ChannelFailed(e.to_string()))?;
        channel
            .request_subsystem(true, name)
            .await
            .map_err(|e| SshError::ChannelFailed(format!("{name} subsystem request failed: {e}")))?;
        Ok(channel)
    }

    /// Open a direct-tcpip channel to `(remote_host, remote_port)` as seen
    /// from the remote side.
    pub async fn open_forward_channel(
        &self,
        remote_host: &str,
        remote_port: u16,
    ) -> Result<russh::Channel<client::Msg>> {
        self.handle
            .channel_open_direct_tcpip(remote_host, remote_port as u32, "127.0.0.1", 0)
            .await
            .map_err(|e| SshError::ChannelFailed(e.to_string()))
    }

    /// Close the control connection. Safe to call more than once.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            debug!("SSH: disconnect error: {e}");
        }
    }
}

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}
