use axum::{
    Form,
    extract::State,
    response::{Html, Redirect},
};
use axum_login::tower_sessions::Session;
use minijinja::context;
use serde::Deserialize;

use crate::{error::AppError, router::AppState, services::members};

use super::render;

#[derive(Debug, Default, Deserialize)]
pub struct MemberForm {
    #[serde(default)]
    name: String,
}

pub async fn index() -> Redirect {
    Redirect::to("/add-member")
}

pub async fn add_member_page(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let members = members::list_members(&state.db).await?;
    render(
        &state,
        &session,
        "add_member.html",
        context! { members => members, active => "add-member" },
    )
    .await
}

pub async fn add_member(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<MemberForm>,
) -> Result<Redirect, AppError> {
    super::admin::add_member_with_notice(&state, &session, &form.name).await?;
    Ok(Redirect::to("/add-member"))
}
