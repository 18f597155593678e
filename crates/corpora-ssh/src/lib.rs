// corpora-ssh: SSH plumbing for the corpus build pipeline.
//
// One control connection per facade, a remote directory guard routed through
// that connection, and local-to-remote port forwarding for services bound to
// the remote host's loopback.
//
// # Example
//
// ```no_run
// use corpora_ssh::{ensure_directory, RemoteSession, SessionConfig, SshEndpoint};
//
// #[tokio::main]
// async fn main() -> corpora_ssh::Result<()> {
//     let endpoint = SshEndpoint::with_password("corpus-host", 22, "builder", "secret");
//     let session = RemoteSession::open(&endpoint, &SessionConfig::default()).await?;
//
//     ensure_directory(&session, "/data/corpus1").await?;
//     let output = session.execute("ls /data").await?;
//     println!("{:?}", output.stdout);
//
//     session.close().await;
//     Ok(())
// }
// ```

mod endpoint;
mod fsguard;
mod session;
mod tunnel;

pub use endpoint::{SessionConfig, SshEndpoint};
pub use fsguard::{ensure_directory, shell_quote};
pub use session::{CommandOutput, RemoteSession};
pub use tunnel::SshTunnel;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SshError {
    #[error("SSH connection failed: {0}")]
    ConnectionFailed(String),

    #[error("SSH authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("SSH channel error: {0}")]
    ChannelFailed(String),

    #[error("remote command timed out after {0}s")]
    CommandTimeout(u64),

    #[error("remote filesystem error on {path}: {detail}")]
    RemoteFilesystem { path: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SshError>;
