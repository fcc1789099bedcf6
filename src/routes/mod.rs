pub mod admin;
pub mod meals;
pub mod members;
pub mod report;

use axum::response::Html;
use axum_login::tower_sessions::Session;
use chrono::{Local, NaiveDate};
use minijinja::{Value, context};

use crate::{error::AppError, flash, router::AppState};

/// Renders a page with the organization name and any queued notices.
pub(crate) async fn render(
    state: &AppState,
    session: &Session,
    name: &str,
    ctx: Value,
) -> Result<Html<String>, AppError> {
    let flashes = flash::take(session).await?;
    let tmpl = state.templates.get_template(name)?;
    let html = tmpl.render(context! {
        organization => state.organization_name.as_ref(),
        flashes => flashes,
        ..ctx
    })?;
    Ok(Html(html))
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}
