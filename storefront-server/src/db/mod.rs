//! Database Module
//!
//! Handles the SQLite connection pool and migrations

pub mod repository;

use repository::{RepoError, RepoResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

/// Database service: owns the SQLite connection pool
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Open (or create) the database at `database_url` with WAL mode and run migrations
    pub async fn new(database_url: &str) -> RepoResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RepoError::Database(format!("Invalid database url: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            // 写冲突时等待 5s 而非立即失败
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to open database: {e}")))?;

        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database on a single long-lived connection
    pub async fn in_memory() -> RepoResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| RepoError::Database(e.to_string()))?
            .foreign_keys(true);

        // 内存库随连接销毁，必须保持唯一连接常驻
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to open database: {e}")))?;

        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> RepoResult<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}
