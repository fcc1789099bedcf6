use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_login::tower_sessions::session;
use sea_orm::DbErr;

/// Failures of member and meal record operations. Everything but `Database`
/// is recovered by the routes and shown to the user as a notice.
#[derive(Debug, thiserror::Error)]
pub enum MealError {
    #[error("Please enter a valid name!")]
    BlankName,

    #[error("Member \"{0}\" already exists!")]
    DuplicateMember(String),

    #[error("Member not found!")]
    MemberNotFound,

    #[error("Meal record not found!")]
    RecordNotFound,

    #[error("invalid meal count {0:?}")]
    InvalidCount(String),

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Failures that end a request with a generic server error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Session(#[from] session::Error),

    #[error(transparent)]
    Meal(#[from] MealError),

    #[error(transparent)]
    Pdf(#[from] lopdf::Error),

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {self}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
