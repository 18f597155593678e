// corpora-database: bookkeeping gateway for the corpus build pipeline.
//
// Owns one MySQL connection, optionally routed through an SSH tunnel when
// the server is only bound to the remote host's loopback.
//
// # Example
//
// ```no_run
// use corpora_database::{Database, DatabaseConfig, MysqlEndpoint};
// use corpora_ssh::SshEndpoint;
//
// #[tokio::main]
// async fn main() -> corpora_database::Result<()> {
//     let mysql = MysqlEndpoint::new("127.0.0.1", 3306, "corpus", "secret", "corpus");
//     let ssh = SshEndpoint::with_password("corpus-host", 22, "builder", "secret");
//
//     let db = Database::connect(&mysql, Some(&ssh), DatabaseConfig::default()).await?;
//     let audio_id = db.add_audio("session-042.wav", 1, 131.5).await?;
//     println!("recorded audio {audio_id}");
//
//     db.close().await;
//     Ok(())
// }
// ```

mod endpoint;
mod gateway;
mod query;
mod segment;

pub use endpoint::{DatabaseConfig, MysqlEndpoint};
pub use gateway::Database;
pub use query::{QueryOutcome, ResultTable, StatementKind};
pub use segment::{Segment, DEFAULT_SPEAKER_ID};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SSH tunnel error: {0}")]
    Tunnel(#[from] corpora_ssh::SshError),

    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("query timed out after {0}s")]
    QueryTimeout(u64),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
