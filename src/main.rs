use meal_tracker::{config::Config, database::setup_database, router::serve};
use sea_orm::{
    ConnectionTrait, DbBackend,
    sqlx::{PgPool, SqlitePool},
};
use tower_sessions_sqlx_store::{PostgresStore, SqliteStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = setup_database(&config.database_url).await?;

    // Sessions live next to the application tables.
    match db.get_database_backend() {
        DbBackend::Postgres => {
            let session_store = PostgresStore::new(PgPool::connect(&config.database_url).await?);
            session_store.migrate().await?;
            serve(&config, db.clone(), session_store).await?;
        }
        DbBackend::Sqlite => {
            let session_store = SqliteStore::new(SqlitePool::connect(&config.database_url).await?);
            session_store.migrate().await?;
            serve(&config, db.clone(), session_store).await?;
        }
        other => anyhow::bail!("unsupported database backend: {other:?}"),
    }

    db.close().await?;
    Ok(())
}
