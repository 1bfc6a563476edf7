//! Database module for SQLite persistence
//!
//! Repositories are thin wrappers over a single connection so the same code
//! runs against a pooled connection or inside a transaction opened by
//! [`UnitOfWork::begin`].

mod chapters;
mod jobs;
mod media;
mod novels;
mod outbox;
mod schema;
mod tags;
mod volumes;

pub use chapters::*;
pub use jobs::*;
pub use media::*;
pub use novels::*;
pub use outbox::*;
pub use schema::*;
pub use tags::*;
pub use volumes::*;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// Create a new database connection pool
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    // Every connection to `:memory:` is a fresh database, so keep exactly one alive
    let in_memory = config.url.contains(":memory:");

    let mut options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .synchronous(SqliteSynchronous::Normal);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?
    };

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Entry point for multi-row writes
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    pool: SqlitePool,
}

impl UnitOfWork {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a transaction. Dropping the provider without `commit` rolls back.
    pub async fn begin(&self) -> Result<RepositoryProvider> {
        let tx = self.pool.begin().await?;
        Ok(RepositoryProvider { tx })
    }
}

/// Repositories bound to one open transaction
pub struct RepositoryProvider {
    tx: Transaction<'static, Sqlite>,
}

impl RepositoryProvider {
    pub fn media(&mut self) -> MediaRepository<'_> {
        MediaRepository::new(&mut self.tx)
    }

    pub fn novels(&mut self) -> NovelRepository<'_> {
        NovelRepository::new(&mut self.tx)
    }

    pub fn volumes(&mut self) -> VolumeRepository<'_> {
        VolumeRepository::new(&mut self.tx)
    }

    pub fn chapters(&mut self) -> ChapterRepository<'_> {
        ChapterRepository::new(&mut self.tx)
    }

    pub fn tags(&mut self) -> TagRepository<'_> {
        TagRepository::new(&mut self.tx)
    }

    pub fn jobs(&mut self) -> JobRepository<'_> {
        JobRepository::new(&mut self.tx)
    }

    pub fn outbox(&mut self) -> OutboxRepository<'_> {
        OutboxRepository::new(&mut self.tx)
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .unwrap()
}
