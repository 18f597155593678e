//! Tunneled MySQL gateway: one connection, optional SSH port forward.

use std::future::Future;
use std::time::Duration;

use log::{debug, info};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tokio::time::timeout;

use corpora_ssh::{SshEndpoint, SshTunnel};

use crate::query::{table_from_rows, QueryOutcome, ResultTable, StatementKind};
use crate::{DatabaseConfig, DatabaseError, MysqlEndpoint, Result, Segment};

/// Scoped database resource.
///
/// Acquisition opens the tunnel (when requested) and then the MySQL
/// connection; [`Database::close`] releases them in reverse order. Every
/// statement commits independently, there is no multi-statement transaction
/// spanning calls.
pub struct Database {
    pool: MySqlPool,
    tunnel: Option<SshTunnel>,
    config: DatabaseConfig,
}

impl Database {
    /// Connect to MySQL, optionally through an SSH tunnel to the remote
    /// host's loopback.
    ///
    /// A failed database connect releases the already-opened tunnel before
    /// returning.
    pub async fn connect(
        mysql: &MysqlEndpoint,
        tunnel_via: Option<&SshEndpoint>,
        config: DatabaseConfig,
    ) -> Result<Self> {
        let tunnel = match tunnel_via {
            Some(ssh) => {
                Some(SshTunnel::open(ssh, &config.session, "127.0.0.1", mysql.port).await?)
            }
            None => None,
        };

        let (host, port) = match &tunnel {
            Some(tunnel) => ("127.0.0.1", tunnel.local_port()),
            None => (mysql.host.as_str(), mysql.port),
        };

        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(&mysql.username)
            .password(&mysql.password)
            .database(&mysql.database);

        // One caller per gateway instance, so one connection is enough.
        let connected = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await;

        let pool = match connected {
            Ok(pool) => pool,
            Err(e) => {
                if let Some(tunnel) = &tunnel {
                    tunnel.close().await;
                }
                return Err(DatabaseError::Connection(format!(
                    "MySQL connection to {host}:{port} failed: {e}"
                )));
            }
        };

        info!(
            "database: connected to {} ({})",
            mysql.database,
            if tunnel.is_some() { "tunneled" } else { "direct" }
        );
        Ok(Self {
            pool,
            tunnel,
            config,
        })
    }

    /// Execute one statement, dispatched on its leading keyword.
    ///
    /// Caller-supplied values must never be interpolated into `statement`;
    /// use the typed operations below, which bind parameters.
    pub async fn run(&self, statement: &str) -> Result<QueryOutcome> {
        debug!("database: run: {}", statement.trim());
        self.with_deadline(async {
            match StatementKind::of(statement) {
                StatementKind::Select => {
                    let rows = sqlx::query(statement).fetch_all(&self.pool).await?;
                    Ok(QueryOutcome::Rows(table_from_rows(&rows)))
                }
                StatementKind::Insert => {
                    let done = sqlx::query(statement).execute(&self.pool).await?;
                    Ok(QueryOutcome::Inserted(done.last_insert_id()))
                }
                StatementKind::Other => {
                    sqlx::query(statement).execute(&self.pool).await?;
                    Ok(QueryOutcome::Done)
                }
            }
        })
        .await
    }

    /// Record a new audio file; returns its generated id.
    pub async fn add_audio(&self, name: &str, corpus_id: u32, duration: f64) -> Result<u64> {
        let done = self
            .with_deadline(async {
                sqlx::query("INSERT INTO Audio (name, corpus_id, duration) VALUES (?, ?, ?)")
                    .bind(name)
                    .bind(corpus_id)
                    .bind(duration)
                    .execute(&self.pool)
                    .await
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(done.last_insert_id())
    }

    /// Record one segment of an audio; returns the new `Dataset` row id.
    pub async fn add_audio_segment(&self, segment: &Segment) -> Result<u64> {
        // `audio_lenght` is the column's spelling in the upstream schema.
        let done = self
            .with_deadline(async {
                sqlx::query(
                    "INSERT INTO Dataset \
                     (file_path, file_with_user, data_gold, task, text_asr, audio_id, \
                      segment_num, audio_lenght, duration, start_time, end_time, speaker_id) \
                     VALUES (?, 0, 0, 1, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&segment.file_path)
                .bind(&segment.text)
                .bind(segment.audio_id)
                .bind(segment.segment_num)
                .bind(segment.frames)
                .bind(segment.duration)
                .bind(segment.start_time)
                .bind(segment.end_time)
                .bind(segment.speaker_id)
                .execute(&self.pool)
                .await
                .map_err(DatabaseError::from)
            })
            .await?;
        Ok(done.last_insert_id())
    }

    pub async fn update_audio_duration(&self, audio_id: u64, duration: f64) -> Result<()> {
        self.with_deadline(async {
            sqlx::query("UPDATE Audio SET duration = ? WHERE id = ?")
                .bind(duration)
                .bind(audio_id)
                .execute(&self.pool)
                .await
                .map_err(DatabaseError::from)
        })
        .await?;
        Ok(())
    }

    /// Audio rows whose name starts with `prefix`.
    pub async fn audios_by_name_prefix(&self, prefix: &str) -> Result<ResultTable> {
        let rows = self
            .with_deadline(async {
                sqlx::query("SELECT * FROM Audio WHERE name LIKE CONCAT(?, '%')")
                    .bind(prefix)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(table_from_rows(&rows))
    }

    /// Local port of the tunnel, when one is open.
    pub fn tunnel_port(&self) -> Option<u16> {
        self.tunnel.as_ref().map(|t| t.local_port())
    }

    /// Close the database connection, then the tunnel.
    pub async fn close(self) {
        self.pool.close().await;
        if let Some(tunnel) = &self.tunnel {
            tunnel.close().await;
        }
    }

    async fn with_deadline<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        timeout(Duration::from_secs(self.config.query_timeout_secs), fut)
            .await
            .map_err(|_| DatabaseError::QueryTimeout(self.config.query_timeout_secs))?
    }
}
