//! SQLite pool for the canonical list store.
//!
//! File-backed stores run in WAL mode with foreign keys on, so list rows,
//! their items and their per-client sync states cascade together. Schema
//! migrations under `migrations/` are embedded at compile time and applied
//! when the pool is opened.
//!
//! ```rust,ignore
//! let pool = create_pool(DatabaseConfig::new("lists.db")).await?;
//! let repository = SqliteListRepository::new(pool);
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Connection settings for the list store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite:` URL of the store
    pub database_url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,
    /// How long SQLite waits on a locked database before failing a write
    pub busy_timeout: Duration,
    pub max_lifetime: Option<Duration>,
    pub idle_timeout: Option<Duration>,
}

impl DatabaseConfig {
    /// Store backed by the file at `database_path`, created if missing
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();

        Self {
            database_url: format!("sqlite:{}", path.display()),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            idle_timeout: Some(Duration::from_secs(10 * 60)),
        }
    }

    /// Private in-memory store.
    ///
    /// Each connection to `sqlite::memory:` sees its own empty database, so
    /// the pool holds exactly one connection and never recycles it.
    pub fn in_memory() -> Self {
        Self {
            database_url: IN_MEMORY_URL.to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            max_lifetime: None,
            idle_timeout: None,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url == IN_MEMORY_URL
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Open the list store, apply pending migrations and verify it answers.
///
/// # Errors
///
/// `LibraryError::Database` if the store cannot be opened or queried,
/// `LibraryError::Migration` if the schema cannot be brought up to date.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Opening list store"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LibraryError::Database)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Could not open list store");
            LibraryError::Database(e)
        })?;

    run_migrations(&pool).await?;
    health_check(&pool).await?;

    debug!(connections = pool.size(), "List store ready");
    Ok(pool)
}

/// Migrated in-memory store for tests
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        warn!(error = %e, "List store migration failed");
        LibraryError::Migration(e.to_string())
    })?;

    debug!("List store schema up to date");
    Ok(())
}

/// Round-trip a trivial query through the pool
pub async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "List store health check failed");
        LibraryError::Database(e)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_opens_and_answers() {
        let pool = create_test_pool().await.unwrap();
        health_check(&pool).await.unwrap();
    }

    #[test]
    fn test_config_defaults() {
        let file = DatabaseConfig::new("/tmp/lists.db")
            .max_connections(8)
            .busy_timeout(Duration::from_secs(1));
        assert_eq!(file.database_url, "sqlite:/tmp/lists.db");
        assert_eq!(file.max_connections, 8);
        assert_eq!(file.busy_timeout, Duration::from_secs(1));
        assert!(!file.is_in_memory());

        let memory = DatabaseConfig::default();
        assert!(memory.is_in_memory());
        assert_eq!(memory.max_connections, 1);
        assert!(memory.max_lifetime.is_none());
    }

    #[tokio::test]
    async fn test_file_store_uses_wal() {
        let path = std::env::temp_dir().join(format!("listsync-{}.db", uuid::Uuid::new_v4()));
        let pool = create_pool(DatabaseConfig::new(&path)).await.unwrap();

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        pool.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.unwrap();

        let (enabled,): (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_schema_has_list_tables() {
        let pool = create_test_pool().await.unwrap();

        for table in ["item_lists", "list_items", "list_sync_states"] {
            let (count,): (i32,) =
                sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                    .bind(table)
                    .fetch_one(&pool)
                    .await
                    .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }
}
