//! Database layer
//!
//! SQLite pool, embedded migrations and the repository implementations.
//!
//! ```ignore
//! use moonglade::config::DatabaseConfig;
//! use moonglade::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};
