//! Schema migrations
//!
//! Every migration carries SQL for both backends and is compiled into the
//! binary. Applied versions are recorded in `_migrations`, so running the set
//! again only applies what is new.
//!
//! ```ignore
//! let pool = daebak::db::create_pool(&config.database).await?;
//! daebak::db::migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};

use super::{Backend, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// All migrations, embedded in the binary.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    // One session per user: a new login replaces the previous token hash
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                token_hash VARCHAR(64) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL UNIQUE,
                token_hash VARCHAR(64) NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 3,
        name: "create_password_resets",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS password_resets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                token_hash VARCHAR(64) NOT NULL UNIQUE,
                expires_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_password_resets_expires_at ON password_resets(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS password_resets (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL UNIQUE,
                token_hash VARCHAR(64) NOT NULL UNIQUE,
                expires_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_password_resets_expires_at ON password_resets(expires_at);
        "#,
    },
    Migration {
        version: 4,
        name: "create_tokens",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tokens (
                uuid VARCHAR(36) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name VARCHAR(255) NOT NULL,
                last_used TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_tokens_user_id ON tokens(user_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tokens (
                uuid VARCHAR(36) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                name VARCHAR(255) NOT NULL,
                last_used TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_tokens_user_id ON tokens(user_id);
        "#,
    },
    Migration {
        version: 5,
        name: "create_articles",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid VARCHAR(36) NOT NULL UNIQUE,
                slug VARCHAR(64) NOT NULL UNIQUE,
                headline VARCHAR(500) NOT NULL,
                content TEXT NOT NULL,
                published BOOLEAN NOT NULL DEFAULT 0,
                source_url VARCHAR(2048),
                source_author VARCHAR(255),
                source_publication VARCHAR(255),
                accessed_at TIMESTAMP NOT NULL,
                published_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_articles_accessed_at ON articles(accessed_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                uuid VARCHAR(36) NOT NULL UNIQUE,
                slug VARCHAR(64) NOT NULL UNIQUE,
                headline VARCHAR(500) NOT NULL,
                content LONGTEXT NOT NULL,
                published BOOLEAN NOT NULL DEFAULT FALSE,
                source_url VARCHAR(2048),
                source_author VARCHAR(255),
                source_publication VARCHAR(255),
                accessed_at TIMESTAMP NOT NULL,
                published_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_articles_accessed_at ON articles(accessed_at);
        "#,
    },
    // word is UNIQUE so concurrent get-or-create calls converge on one row
    Migration {
        version: 6,
        name: "create_vocabulary",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS vocabulary (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word VARCHAR(255) NOT NULL UNIQUE,
                definition TEXT,
                examples TEXT,
                translation_en TEXT
            );
            CREATE TABLE IF NOT EXISTS article_vocabulary (
                article_id INTEGER NOT NULL,
                vocabulary_id INTEGER NOT NULL,
                PRIMARY KEY (article_id, vocabulary_id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (vocabulary_id) REFERENCES vocabulary(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_article_vocabulary_vocabulary_id ON article_vocabulary(vocabulary_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS vocabulary (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                word VARCHAR(255) NOT NULL UNIQUE,
                definition TEXT,
                examples TEXT,
                translation_en TEXT
            );
            CREATE TABLE IF NOT EXISTS article_vocabulary (
                article_id BIGINT NOT NULL,
                vocabulary_id BIGINT NOT NULL,
                PRIMARY KEY (article_id, vocabulary_id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (vocabulary_id) REFERENCES vocabulary(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_article_vocabulary_vocabulary_id ON article_vocabulary(vocabulary_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER,
                name VARCHAR(100) NOT NULL UNIQUE,
                FOREIGN KEY (parent_id) REFERENCES tags(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS article_tags (
                article_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (article_id, tag_id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_article_tags_tag_id ON article_tags(tag_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                parent_id BIGINT NULL,
                name VARCHAR(100) NOT NULL UNIQUE,
                FOREIGN KEY (parent_id) REFERENCES tags(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS article_tags (
                article_id BIGINT NOT NULL,
                tag_id BIGINT NOT NULL,
                PRIMARY KEY (article_id, tag_id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_article_tags_tag_id ON article_tags(tag_id);
        "#,
    },
    Migration {
        version: 8,
        name: "create_grammar",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS grammar (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                explanation TEXT,
                explanation_short TEXT,
                examples TEXT,
                practice TEXT
            );
            CREATE TABLE IF NOT EXISTS article_grammar (
                article_id INTEGER NOT NULL,
                grammar_id INTEGER NOT NULL,
                article_example TEXT,
                PRIMARY KEY (article_id, grammar_id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (grammar_id) REFERENCES grammar(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS grammar (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                explanation TEXT,
                explanation_short TEXT,
                examples TEXT,
                practice TEXT
            );
            CREATE TABLE IF NOT EXISTS article_grammar (
                article_id BIGINT NOT NULL,
                grammar_id BIGINT NOT NULL,
                article_example TEXT,
                PRIMARY KEY (article_id, grammar_id),
                FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
                FOREIGN KEY (grammar_id) REFERENCES grammar(id) ON DELETE CASCADE
            );
        "#,
    },
];

impl Migration {
    fn sql(&self, driver: DatabaseDriver) -> &'static str {
        match driver {
            DatabaseDriver::Sqlite => self.up_sqlite,
            DatabaseDriver::Mysql => self.up_mysql,
        }
    }
}

/// Run all pending migrations
///
/// Returns the number of migrations applied by this call.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    let pending = pending_migrations(pool).await?;
    if pending.is_empty() {
        tracing::debug!("No pending migrations");
        return Ok(0);
    }

    for migration in &pending {
        tracing::info!("Applying migration {}: {}", migration.version, migration.name);
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
    }

    tracing::info!("Applied {} migration(s)", pending.len());
    Ok(pending.len())
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    Ok(pending_migrations(pool).await?.len())
}

async fn pending_migrations(pool: &DynDatabasePool) -> Result<Vec<&'static Migration>> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )"
        }
        DatabaseDriver::Mysql => {
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )"
        }
    };
    pool.execute(sql).await?;

    let query = "SELECT version FROM _migrations";
    let applied: Vec<i32> = match pool.backend() {
        Backend::Sqlite(pool) => sqlx::query_scalar(query).fetch_all(pool).await,
        Backend::Mysql(pool) => sqlx::query_scalar(query).fetch_all(pool).await,
    }
    .context("Failed to read applied migrations")?;

    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect())
}

/// Run each statement of a migration, then record its version.
///
/// MySQL commits DDL implicitly, so statements are not wrapped in a transaction.
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    for statement in statements(migration.sql(pool.driver())) {
        pool.execute(statement)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    let record = "INSERT INTO _migrations (version, name) VALUES (?, ?)";
    match pool.backend() {
        Backend::Sqlite(pool) => sqlx::query(record)
            .bind(migration.version)
            .bind(migration.name)
            .execute(pool)
            .await
            .map(drop),
        Backend::Mysql(pool) => sqlx::query(record)
            .bind(migration.version)
            .bind(migration.name)
            .execute(pool)
            .await
            .map(drop),
    }
    .context("Failed to record migration")
}

/// First 100 characters of a statement, for error messages
fn truncate_sql(sql: &str) -> String {
    let mut short: String = sql.chars().take(100).collect();
    if short.len() < sql.len() {
        short.push_str("...");
    }
    short
}

/// Semicolon separated statements, skipping blanks and comment-only chunks.
/// Migration SQL never contains a semicolon inside a literal.
fn statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}
