// corpora-transfer: scoped file transfer for the corpus build pipeline.
//
// One control connection plus one SFTP data channel per facade instance,
// acquired together and released in reverse order.
//
// # Example
//
// ```no_run
// use corpora_transfer::{FileTransfer, TransferConfig};
// use corpora_ssh::SshEndpoint;
// use std::path::Path;
//
// #[tokio::main]
// async fn main() -> corpora_transfer::Result<()> {
//     let endpoint = SshEndpoint::with_password("corpus-host", 22, "builder", "secret");
//     let transfer = FileTransfer::connect(&endpoint, TransferConfig::default()).await?;
//
//     transfer.put(Path::new("a.wav"), "/data/corpus1/", true).await?;
//     for file in transfer.list_files_recursive("/data/corpus1").await? {
//         println!("{file}");
//     }
//
//     transfer.close().await;
//     Ok(())
// }
// ```

mod facade;

pub use facade::{FileTransfer, TransferConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("SSH error: {0}")]
    Ssh(#[from] corpora_ssh::SshError),

    #[error("SFTP session error: {0}")]
    Sftp(String),

    #[error("failed to copy {source_path} to {destination}: {detail}")]
    Copy {
        source_path: String,
        destination: String,
        detail: String,
    },

    #[error("remote listing of {path} failed: {detail}")]
    Listing { path: String, detail: String },

    #[error("transfer timed out after {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, TransferError>;
