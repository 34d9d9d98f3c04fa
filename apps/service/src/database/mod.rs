/// Storage layer
///
/// LibSQL (local SQLite) behind a managed connection pool. The checks table
/// is append-only; everything else is small reference data.
pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{Database, LibsqlDatabase};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
