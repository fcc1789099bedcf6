pub mod backend;

use axum_login::tower_sessions::Session;

use crate::error::AppError;
use crate::flash;
use backend::{AuthSession, Credentials};

/// Logged-out → logged-in when the password matches; otherwise the session
/// stays logged out and an error notice is queued.
pub async fn log_in(
    auth_session: &mut AuthSession,
    session: &Session,
    password: String,
) -> Result<bool, AppError> {
    let user = auth_session
        .authenticate(Credentials { password })
        .await
        .map_err(|e| AppError::Auth(e.to_string()))?;

    match user {
        Some(user) => {
            auth_session
                .login(&user)
                .await
                .map_err(|e| AppError::Auth(e.to_string()))?;
            tracing::info!("admin logged in");
            flash::success(session, "Admin login successful!").await?;
            Ok(true)
        }
        None => {
            tracing::warn!("rejected admin login");
            flash::error(session, "Invalid password!").await?;
            Ok(false)
        }
    }
}

pub async fn log_out(auth_session: &mut AuthSession, session: &Session) -> Result<(), AppError> {
    auth_session
        .logout()
        .await
        .map_err(|e| AppError::Auth(e.to_string()))?;
    tracing::info!("admin logged out");
    flash::success(session, "Logged out successfully!").await?;
    Ok(())
}
