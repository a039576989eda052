//! Database connection pools
//!
//! SQLite and MySQL pools sit behind [`DatabasePool`]. Repositories borrow the
//! concrete pool through [`Backend`] and pick the matching SQL dialect.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 20;
const MYSQL_MAX_CONNECTIONS: u32 = 30;

/// Borrowed concrete pool, used by repositories to pick the SQL dialect
#[derive(Clone, Copy)]
pub enum Backend<'a> {
    Sqlite(&'a SqlitePool),
    Mysql(&'a MySqlPool),
}

/// A connection pool for one of the supported backends.
///
/// Implementors only expose [`DatabasePool::backend`]; everything else is
/// derived from it.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Borrow the concrete pool
    fn backend(&self) -> Backend<'_>;

    /// Run a statement that returns no rows, yielding the affected row count
    async fn execute(&self, query: &str) -> Result<u64> {
        let affected = match self.backend() {
            Backend::Sqlite(pool) => sqlx::query(query).execute(pool).await.map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(query).execute(pool).await.map(|r| r.rows_affected()),
        };
        affected.with_context(|| format!("Failed to execute query: {}", query))
    }

    async fn ping(&self) -> Result<()> {
        match self.backend() {
            Backend::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(drop),
            Backend::Mysql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(drop),
        }
        .context("Database ping failed")
    }

    async fn close(&self) {
        match self.backend() {
            Backend::Sqlite(pool) => pool.close().await,
            Backend::Mysql(pool) => pool.close().await,
        }
    }

    fn driver(&self) -> DatabaseDriver {
        match self.backend() {
            Backend::Sqlite(_) => DatabaseDriver::Sqlite,
            Backend::Mysql(_) => DatabaseDriver::Mysql,
        }
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self.backend() {
            Backend::Sqlite(pool) => Some(pool),
            Backend::Mysql(_) => None,
        }
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        match self.backend() {
            Backend::Mysql(pool) => Some(pool),
            Backend::Sqlite(_) => None,
        }
    }
}

/// Shared handle to whichever pool the config selected
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Where a configured SQLite URL points
#[derive(Debug, PartialEq, Eq)]
struct SqliteTarget {
    connection_url: String,
    /// Database file whose directory must exist before connecting
    file: Option<PathBuf>,
}

impl SqliteTarget {
    fn in_memory(&self) -> bool {
        self.file.is_none()
    }
}

/// Accepts `:memory:`, `sqlite::memory:`, `sqlite:<path>[?opts]` or a bare path.
/// Files are opened with `mode=rwc` unless options are already given.
fn sqlite_target(url: &str) -> SqliteTarget {
    if url == ":memory:" || url.starts_with("sqlite::memory:") {
        let connection_url = if url == ":memory:" { "sqlite::memory:" } else { url };
        return SqliteTarget {
            connection_url: connection_url.to_string(),
            file: None,
        };
    }

    let path = url.strip_prefix("sqlite:").unwrap_or(url);
    let file = PathBuf::from(path.split('?').next().unwrap_or(path));
    let connection_url = if path.contains('?') {
        format!("sqlite:{}", path)
    } else {
        format!("sqlite:{}?mode=rwc", path)
    };
    SqliteTarget {
        connection_url,
        file: Some(file),
    }
}

/// SQLite pool with foreign keys enforced on every connection
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let target = sqlite_target(url);

        if let Some(dir) = target.file.as_ref().and_then(|f| f.parent()) {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create database directory: {:?}", dir))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&target.connection_url)
            .with_context(|| format!("Invalid SQLite URL: {}", url))?
            .foreign_keys(true);

        // Each ":memory:" connection is its own empty database, so the pool
        // keeps a single connection alive for its whole lifetime.
        let pool_options = if target.in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(SQLITE_MAX_CONNECTIONS)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        Ok(Self { pool })
    }
}

impl DatabasePool for SqliteDatabase {
    fn backend(&self) -> Backend<'_> {
        Backend::Sqlite(&self.pool)
    }
}

pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(MYSQL_MAX_CONNECTIONS)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to MySQL database: {}", url))?;

        Ok(Self { pool })
    }
}

impl DatabasePool for MysqlDatabase {
    fn backend(&self) -> Backend<'_> {
        Backend::Mysql(&self.pool)
    }
}

/// Open the pool selected by `config.driver`
///
/// ```ignore
/// let pool = daebak::db::create_pool(&DatabaseConfig::default()).await?;
/// pool.ping().await?;
/// ```
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let pool: DynDatabasePool = match config.driver {
        DatabaseDriver::Sqlite => Arc::new(SqliteDatabase::new(&config.url).await?),
        DatabaseDriver::Mysql => Arc::new(MysqlDatabase::new(&config.url).await?),
    };
    Ok(pool)
}

/// In-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_target_memory() {
        for url in [":memory:", "sqlite::memory:"] {
            let target = sqlite_target(url);
            assert!(target.in_memory());
            assert_eq!(target.connection_url, "sqlite::memory:");
        }
    }

    #[test]
    fn test_sqlite_target_files() {
        let bare = sqlite_target("data/daebak.db");
        assert_eq!(bare.connection_url, "sqlite:data/daebak.db?mode=rwc");
        assert_eq!(bare.file, Some(PathBuf::from("data/daebak.db")));

        let prefixed = sqlite_target("sqlite:data/daebak.db");
        assert_eq!(prefixed.connection_url, "sqlite:data/daebak.db?mode=rwc");

        let with_opts = sqlite_target("sqlite:data/daebak.db?mode=ro");
        assert_eq!(with_opts.connection_url, "sqlite:data/daebak.db?mode=ro");
        assert_eq!(with_opts.file, Some(PathBuf::from("data/daebak.db")));
    }

    #[tokio::test]
    async fn test_test_pool_is_sqlite() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_execute_reports_affected_rows() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        pool.execute("CREATE TABLE words (id INTEGER PRIMARY KEY, word TEXT)")
            .await
            .expect("Failed to create table");
        let affected = pool
            .execute("INSERT INTO words (word) VALUES ('사과'), ('배')")
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn test_memory_pool_shares_one_database() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        pool.execute("CREATE TABLE shared (id INTEGER PRIMARY KEY)")
            .await
            .expect("Failed to create table");

        // Concurrent queries must all see the table created above
        let sqlite = pool.as_sqlite().unwrap();
        let (a, b) = tokio::join!(
            sqlx::query("SELECT COUNT(*) FROM shared").fetch_one(sqlite),
            sqlx::query("SELECT COUNT(*) FROM shared").fetch_one(sqlite),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let row = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to read pragma");
        let enabled: i64 = sqlx::Row::get(&row, 0);
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_file_pool_creates_directories() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = dir.path().join("nested").join("daebak.db");

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        })
        .await
        .expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");
        assert!(db_path.exists());
        pool.close().await;
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/test".to_string());
        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        })
        .await
        .expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        assert!(pool.as_mysql().is_some());
        pool.ping().await.expect("Ping should succeed");
    }
}
