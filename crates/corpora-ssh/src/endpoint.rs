//! Endpoint and tuning types supplied fully formed by the calling pipeline.

use serde::Deserialize;

/// SSH endpoint for a corpus storage host.
///
/// The credential is either a password or an in-memory private key in any
/// format `russh_keys::decode_secret_key` understands (OpenSSH, PEM, PKCS#8).
/// Password takes precedence when both are set.
#[derive(Debug, Clone, Deserialize)]
pub struct SshEndpoint {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub private_key_passphrase: Option<String>,
}

fn default_ssh_port() -> u16 {
    22
}

impl SshEndpoint {
    pub fn with_password(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: Some(password.into()),
            private_key: None,
            private_key_passphrase: None,
        }
    }

    pub fn with_private_key(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        private_key: impl Into<String>,
        passphrase: Option<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: None,
            private_key: Some(private_key.into()),
            private_key_passphrase: passphrase,
        }
    }
}

/// Deadlines for connection setup and single remote operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bound on TCP/SSH setup and on each authentication attempt.
    pub connect_timeout_secs: u64,
    /// Bound on one `execute` call, so a hung remote shell cannot block the
    /// caller indefinitely.
    pub command_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            command_timeout_secs: 60,
        }
    }
}
