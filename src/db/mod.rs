//! Database layer
//!
//! Storage abstraction for the Folio platform. Two backends are
//! supported, selected by configuration:
//! - SQLite (default, single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The `DatabasePool` trait hides the backend; repositories dispatch on
//! `driver()` and use the concrete pool for their SQL. Cascading deletes
//! are enforced by foreign keys, not application code.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
