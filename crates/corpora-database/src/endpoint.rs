//! MySQL endpoint and gateway tuning.

use corpora_ssh::SessionConfig;
use serde::Deserialize;

/// MySQL endpoint for the corpus bookkeeping database.
///
/// When the gateway tunnels, `port` is also the remote bind port the tunnel
/// targets on the remote host's loopback; `host` is only used for direct
/// connections.
#[derive(Debug, Clone, Deserialize)]
pub struct MysqlEndpoint {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

fn default_mysql_port() -> u16 {
    3306
}

impl MysqlEndpoint {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            database: database.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Applied to the SSH session backing the tunnel, when one is opened.
    pub session: SessionConfig,
    /// Bound on one statement dispatch, so a hung server cannot block the
    /// caller indefinitely.
    pub query_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            query_timeout_secs: 300,
        }
    }
}
