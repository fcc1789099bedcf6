use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::info;

/// Opens the connection and brings the schema up to date.
pub async fn setup_database(db_url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(db_url);
    // Every connection to an in-memory SQLite database sees its own database.
    if db_url.contains(":memory:") {
        opts.max_connections(1);
    }
    opts.sqlx_logging(false);

    let db = Database::connect(opts).await?;
    Migrator::up(&db, None).await?;
    info!(backend = ?db.get_database_backend(), "database ready");

    Ok(db)
}
