//! Database layer
//!
//! SQLite is the default store and MySQL is supported for larger deployments.
//! Repositories match on [`Backend`] and run the dialect of the connected store.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};

/// Whether an error chain contains a unique-constraint violation reported by
/// the database driver.
///
/// Repositories wrap driver errors with `anyhow` context; this looks through
/// that context for the underlying `sqlx::Error`.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
        )
    })
}
