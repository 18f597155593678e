//! Remote directory guard: make sure a directory exists before a copy.

use log::debug;

use crate::{RemoteSession, Result, SshError};

/// Quote `s` as a single POSIX shell word.
///
/// Wraps the string in single quotes and splices embedded single quotes as
/// `'\''`, so the remote shell sees exactly one literal argument no matter
/// what the path contains.
pub fn shell_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Create `path` and any missing ancestors on the remote host.
///
/// Succeeds silently when the directory already exists (`mkdir -p`
/// semantics). Any other failure, such as permission denied or a read-only
/// filesystem, surfaces as [`SshError::RemoteFilesystem`] and the caller
/// must not proceed with a copy into `path`.
pub async fn ensure_directory(session: &RemoteSession, path: &str) -> Result<()> {
    let command = format!("mkdir -p {}", shell_quote(path));
    let output = session.execute(&command).await?;
    if !output.success() {
        return Err(SshError::RemoteFilesystem {
            path: path.to_string(),
            detail: output.stderr.join("\n"),
        });
    }
    debug!("SSH: ensured remote directory {path}");
    Ok(())
}
