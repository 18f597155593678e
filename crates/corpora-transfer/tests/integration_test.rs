//! Integration tests for the transfer facade.
//!
//! These tests require a running SSH server with the SFTP subsystem.
//! Start one with:
//!   docker-compose -f docker-compose.test.yml up -d ssh
//!
//! Run tests with:
//!   cargo test --package corpora-transfer --test integration_test -- --include-ignored
//!
//! Connection details:
//!   Host: localhost:2222
//!   User: linuxuser
//!   Password: alpine

use std::time::Duration;
use tokio::time::timeout;

async fn port_is_open(host: &str, port: u16) -> bool {
    timeout(
        Duration::from_secs(1),
        tokio::net::TcpStream::connect(format!("{}:{}", host, port)),
    )
    .await
    .map(|r| r.is_ok())
    .unwrap_or(false)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use corpora_ssh::SshEndpoint;
    use corpora_transfer::{FileTransfer, TransferConfig, TransferError};
    use std::io::Write;

    const HOST: &str = "127.0.0.1";
    const PORT: u16 = 2222;
    const USERNAME: &str = "linuxuser";
    const PASSWORD: &str = "alpine";

    fn endpoint() -> SshEndpoint {
        SshEndpoint::with_password(HOST, PORT, USERNAME, PASSWORD)
    }

    async fn skip_if_not_available() -> bool {
        if !port_is_open(HOST, PORT).await {
            eprintln!(
                "Skipping transfer tests - SSH server not available on {}:{}",
                HOST, PORT
            );
            eprintln!("Start with: docker-compose -f docker-compose.test.yml up -d ssh");
            return true;
        }
        false
    }

    fn local_wav(name: &str, contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        (dir, path)
    }

    #[tokio::test]
    #[ignore]
    async fn put_into_directory_creates_it_and_uses_basename() {
        if skip_if_not_available().await {
            return;
        }

        let transfer = FileTransfer::connect(&endpoint(), TransferConfig::default())
            .await
            .expect("facade should connect");
        assert!(transfer.is_active());

        let (_guard, wav) = local_wav("a.wav", b"RIFF fake audio");
        let remote_dir = format!("/tmp/corpora-put-{}/", std::process::id());
        transfer.put(&wav, &remote_dir, true).await.unwrap();

        let files = transfer.list_files(remote_dir.trim_end_matches('/')).await.unwrap();
        assert_eq!(files, vec!["a.wav".to_string()]);

        transfer.close().await;
    }

    #[tokio::test]
    #[ignore]
    async fn put_to_exact_path_creates_parent_first() {
        if skip_if_not_available().await {
            return;
        }

        let transfer = FileTransfer::connect(&endpoint(), TransferConfig::default())
            .await
            .unwrap();

        let (_guard, wav) = local_wav("seg.wav", b"segment bytes");
        let remote_path = format!("/tmp/corpora-exact-{}/deep/seg-001.wav", std::process::id());
        transfer.put(&wav, &remote_path, false).await.unwrap();

        let found = transfer
            .list_files_recursive(&format!("/tmp/corpora-exact-{}", std::process::id()))
            .await
            .unwrap();
        assert_eq!(found, vec![remote_path.clone()]);

        transfer.close().await;
    }

    #[tokio::test]
    #[ignore]
    async fn put_failure_propagates_and_facade_still_closes() {
        if skip_if_not_available().await {
            return;
        }

        let transfer = FileTransfer::connect(&endpoint(), TransferConfig::default())
            .await
            .unwrap();

        let (_guard, wav) = local_wav("a.wav", b"x");
        // Unprivileged user cannot create directories under /.
        let result = transfer.put(&wav, "/corpora-denied/", true).await;
        assert!(matches!(result, Err(TransferError::Ssh(_))));

        // The session survives a per-operation failure.
        assert!(transfer.is_active());
        let listed = transfer.list_files("/tmp").await;
        assert!(listed.is_ok());

        transfer.close().await;
    }

    #[tokio::test]
    #[ignore]
    async fn listing_missing_path_is_an_error() {
        if skip_if_not_available().await {
            return;
        }

        let transfer = FileTransfer::connect(&endpoint(), TransferConfig::default())
            .await
            .unwrap();

        let result = transfer.list_files("/no/such/directory").await;
        assert!(matches!(result, Err(TransferError::Listing { .. })));

        transfer.close().await;
    }
}
