pub mod meals;
pub mod members;
pub mod report;

#[cfg(test)]
pub(crate) async fn test_db() -> sea_orm::DatabaseConnection {
    crate::database::setup_database("sqlite::memory:")
        .await
        .expect("in-memory database")
}
