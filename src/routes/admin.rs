use std::collections::HashMap;

use axum::{
    Form,
    extract::{Query, State},
    response::{Html, Redirect},
};
use axum_login::tower_sessions::Session;
use minijinja::context;
use serde::Deserialize;

use crate::{
    auth::{
        self,
        backend::{AdminUser, AuthSession},
    },
    error::{AppError, MealError},
    flash,
    router::AppState,
    services::{
        meals::{self, DATE_FORMAT, EditOutcome, RecordEdit},
        members,
    },
};

use super::{render, today};

pub const DEFAULT_HISTORY_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    days: Option<String>,
}

impl HistoryParams {
    /// Window size in days. Missing or unparsable values fall back to the
    /// default and negative ones clamp to zero.
    fn days(&self) -> u64 {
        self.days
            .as_deref()
            .and_then(|days| days.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_HISTORY_DAYS)
            .max(0) as u64
    }
}

pub async fn admin_page(
    State(state): State<AppState>,
    auth_session: AuthSession,
    session: Session,
    Query(params): Query<HistoryParams>,
) -> Result<Html<String>, AppError> {
    if auth_session.user.is_none() {
        return render(&state, &session, "admin_login.html", context! { active => "admin" }).await;
    }

    let days = params.days();
    let today = today();
    let history = meals::history(&state.db, today, days).await?;
    let members = members::list_members(&state.db).await?;

    render(
        &state,
        &session,
        "admin.html",
        context! {
            members => members,
            groups => history.groups,
            days_back => days,
            start_date => history.start.format(DATE_FORMAT).to_string(),
            end_date => history.end.format(DATE_FORMAT).to_string(),
            today => today.format(DATE_FORMAT).to_string(),
            active => "admin",
        },
    )
    .await
}

pub async fn admin_action(
    State(state): State<AppState>,
    mut auth_session: AuthSession,
    session: Session,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    match auth_session.user.clone() {
        None => {
            let password = form.get("password").cloned().unwrap_or_default();
            auth::log_in(&mut auth_session, &session, password).await?;
        }
        Some(_) if form.contains_key("logout") => {
            auth::log_out(&mut auth_session, &session).await?;
        }
        Some(admin) => dispatch(&state, &session, &admin, &form).await?,
    }

    Ok(Redirect::to("/admin"))
}

/// Runs the first management action named in the form. Only reachable
/// with a logged-in admin.
async fn dispatch(
    state: &AppState,
    session: &Session,
    admin: &AdminUser,
    form: &HashMap<String, String>,
) -> Result<(), AppError> {
    let field = |key: &str| form.get(key).map(String::as_str);

    if form.contains_key("add_member") {
        add_member_with_notice(state, session, field("member_name").unwrap_or_default()).await?;
    } else if form.contains_key("remove_member") {
        remove_member(state, session, field("member_id")).await?;
    } else if form.contains_key("update_meal") {
        let edit = RecordEdit::parse(
            field("record_id"),
            field("member_id"),
            field("meal_date"),
            field("meal_count"),
        );
        update_meal(state, session, edit).await?;
    } else {
        tracing::debug!(?admin, "admin post without a recognised action");
    }

    Ok(())
}

/// Shared by the public add-member page and the admin panel.
pub(crate) async fn add_member_with_notice(
    state: &AppState,
    session: &Session,
    name: &str,
) -> Result<(), AppError> {
    match members::add_member(&state.db, name).await {
        Ok(member) => {
            flash::success(session, format!("Member \"{}\" added successfully!", member.name))
                .await?
        }
        Err(MealError::Database(err)) => return Err(err.into()),
        Err(err) => flash::error(session, err.to_string()).await?,
    }
    Ok(())
}

async fn remove_member(
    state: &AppState,
    session: &Session,
    member_id: Option<&str>,
) -> Result<(), AppError> {
    let Some(member_id) = member_id.and_then(|id| id.trim().parse::<i32>().ok()) else {
        flash::error(session, MealError::MemberNotFound.to_string()).await?;
        return Ok(());
    };

    match members::remove_member(&state.db, member_id).await {
        Ok(name) => {
            flash::success(
                session,
                format!("Member \"{name}\" and all their meal records removed successfully!"),
            )
            .await?
        }
        Err(MealError::MemberNotFound) => {
            flash::error(session, MealError::MemberNotFound.to_string()).await?
        }
        Err(err) => {
            tracing::error!(member_id, "failed to remove member: {err}");
            flash::error(session, format!("Error removing member: {err}")).await?
        }
    }
    Ok(())
}

async fn update_meal(
    state: &AppState,
    session: &Session,
    edit: Result<RecordEdit, MealError>,
) -> Result<(), AppError> {
    let result = match edit {
        Ok(edit) => meals::apply_record_edit(&state.db, edit).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(EditOutcome::Updated(_)) => {
            flash::success(session, "Meal record updated successfully!").await?
        }
        Ok(EditOutcome::Saved(_)) => flash::success(session, "Meal record saved successfully!").await?,
        Err(err @ (MealError::RecordNotFound | MealError::MemberNotFound)) => {
            flash::error(session, err.to_string()).await?
        }
        Err(err) => {
            tracing::warn!("meal record edit failed: {err}");
            flash::error(session, format!("Error updating record: {err}")).await?
        }
    }
    Ok(())
}
