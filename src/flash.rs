//! One-shot notices kept in the session until the next rendered page.

use axum_login::tower_sessions::{Session, session};
use serde::{Deserialize, Serialize};

const FLASH_KEY: &str = "flash.messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

pub async fn push(
    session: &Session,
    level: Level,
    message: impl Into<String>,
) -> Result<(), session::Error> {
    let mut messages: Vec<Flash> = session.get(FLASH_KEY).await?.unwrap_or_default();
    messages.push(Flash {
        level,
        message: message.into(),
    });
    session.insert(FLASH_KEY, messages).await
}

pub async fn success(session: &Session, message: impl Into<String>) -> Result<(), session::Error> {
    push(session, Level::Success, message).await
}

pub async fn error(session: &Session, message: impl Into<String>) -> Result<(), session::Error> {
    push(session, Level::Error, message).await
}

/// Drains the queued notices.
pub async fn take(session: &Session) -> Result<Vec<Flash>, session::Error> {
    Ok(session
        .remove::<Vec<Flash>>(FLASH_KEY)
        .await?
        .unwrap_or_default())
}
