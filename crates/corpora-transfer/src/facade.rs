//! Transfer facade: control connection, directory guard, and SFTP data
//! channel composed into one scoped resource.

use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use corpora_ssh::{
    ensure_directory, shell_quote, RemoteSession, SessionConfig, SshEndpoint, SshError,
};

use crate::{Result, TransferError};

/// Tuning for the transfer facade.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub session: SessionConfig,
    /// Bound on one `put` copy, generous enough for a full recording.
    pub transfer_timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            transfer_timeout_secs: 600,
        }
    }
}

/// Where a `put` writes and which directory must exist first.
#[derive(Debug, PartialEq, Eq)]
struct PutPlan {
    ensure: Option<String>,
    target: String,
}

/// Scoped transfer resource.
///
/// Acquisition opens the control connection, verifies the transport is
/// active, and binds the SFTP data channel to it. Release with
/// [`FileTransfer::close`] tears them down in reverse order.
pub struct FileTransfer {
    session: RemoteSession,
    sftp: SftpSession,
    config: TransferConfig,
}

impl FileTransfer {
    /// Open the control connection and bind the SFTP data channel to it.
    ///
    /// Fails fast when the transport comes up inactive; there are no silent
    /// retries, the caller decides whether to retry or abort the run.
    pub async fn connect(endpoint: &SshEndpoint, config: TransferConfig) -> Result<Self> {
        let session = RemoteSession::open(endpoint, &config.session).await?;
        if !session.is_active() {
            session.close().await;
            return Err(TransferError::Ssh(SshError::ConnectionFailed(
                "SSH transport is not active".to_string(),
            )));
        }

        let channel = match session.open_subsystem_channel("sftp").await {
            Ok(channel) => channel,
            Err(e) => {
                session.close().await;
                return Err(e.into());
            }
        };

        let sftp = match SftpSession::new(channel.into_stream()).await {
            Ok(sftp) => sftp,
            Err(e) => {
                session.close().await;
                return Err(TransferError::Sftp(e.to_string()));
            }
        };

        info!("transfer: SFTP data channel ready on {}", endpoint.host);
        Ok(Self {
            session,
            sftp,
            config,
        })
    }

    /// Copy one local file to the remote host.
    ///
    /// With `destination_is_directory` set, the file lands at
    /// `destination/basename(source)`; otherwise at `destination` exactly,
    /// after its parent directory is ensured. Exactly one remote write per
    /// call, preceded by at most one idempotent directory creation.
    ///
    /// Failures propagate; a failed directory guard means no copy is
    /// attempted at all.
    pub async fn put(
        &self,
        source: &Path,
        destination: &str,
        destination_is_directory: bool,
    ) -> Result<()> {
        let plan = plan_put(source, destination, destination_is_directory)?;
        if let Some(dir) = &plan.ensure {
            ensure_directory(&self.session, dir).await?;
        }

        let deadline = Duration::from_secs(self.config.transfer_timeout_secs);
        timeout(deadline, self.copy_file(source, &plan.target))
            .await
            .map_err(|_| TransferError::Timeout(self.config.transfer_timeout_secs))??;

        debug!("transfer: {} -> {}", source.display(), plan.target);
        Ok(())
    }

    async fn copy_file(&self, source: &Path, target: &str) -> Result<()> {
        let copy_err = |detail: String| TransferError::Copy {
            source_path: source.display().to_string(),
            destination: target.to_string(),
            detail,
        };

        let mut local_file = tokio::fs::File::open(source)
            .await
            .map_err(|e| copy_err(e.to_string()))?;
        let mut remote_file = self
            .sftp
            .open_with_flags(
                target,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| copy_err(e.to_string()))?;

        tokio::io::copy(&mut local_file, &mut remote_file)
            .await
            .map_err(|e| copy_err(e.to_string()))?;
        remote_file
            .shutdown()
            .await
            .map_err(|e| copy_err(e.to_string()))?;
        Ok(())
    }

    /// Immediate entries of a remote directory, in remote listing order.
    pub async fn list_files(&self, path: &str) -> Result<Vec<String>> {
        self.listing(path, &format!("ls {}", shell_quote(path)))
            .await
    }

    /// Every file under `path` and its subdirectories.
    pub async fn list_files_recursive(&self, path: &str) -> Result<Vec<String>> {
        self.listing(path, &format!("find {} -type f", shell_quote(path)))
            .await
    }

    async fn listing(&self, path: &str, command: &str) -> Result<Vec<String>> {
        let output = self.session.execute(command).await?;
        if !output.success() {
            return Err(TransferError::Listing {
                path: path.to_string(),
                detail: output.stderr.join("\n"),
            });
        }
        Ok(output.stdout)
    }

    /// Whether the underlying control connection is still usable.
    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    /// Release the data channel, then the control connection.
    pub async fn close(self) {
        if let Err(e) = self.sftp.close().await {
            debug!("transfer: SFTP close error: {e}");
        }
        self.session.close().await;
    }
}

fn plan_put(source: &Path, destination: &str, destination_is_directory: bool) -> Result<PutPlan> {
    if destination_is_directory {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::Copy {
                source_path: source.display().to_string(),
                destination: destination.to_string(),
                detail: "source has no usable file name".to_string(),
            })?;
        Ok(PutPlan {
            ensure: Some(destination.to_string()),
            target: join_remote(destination, name),
        })
    } else {
        Ok(PutPlan {
            ensure: remote_parent(destination).map(str::to_string),
            target: destination.to_string(),
        })
    }
}

// The remote side is POSIX regardless of the local OS, so path math on
// destination strings stays string-based instead of going through `Path`.

fn join_remote(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

fn remote_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}
