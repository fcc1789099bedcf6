use std::collections::HashMap;

use axum::{
    Form,
    extract::State,
    response::{Html, Redirect},
};
use axum_login::tower_sessions::Session;
use minijinja::context;
use serde::Serialize;

use crate::{
    error::AppError,
    flash,
    router::AppState,
    services::{meals, members},
};

use super::{render, today};

/// Choices offered per member on the daily page.
pub const MEAL_CHOICES: [i32; 5] = [0, 1, 2, 3, 4];

#[derive(Serialize)]
struct MealRow {
    id: i32,
    name: String,
    field: String,
    count: i32,
}

pub async fn meals_page(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let today = today();
    let members = members::list_members(&state.db).await?;
    let counts = meals::counts_for_day(&state.db, today).await?;

    let rows: Vec<MealRow> = members
        .into_iter()
        .map(|member| MealRow {
            field: meals::daily_field_name(today, member.id),
            count: counts.get(&member.id).copied().unwrap_or(0),
            id: member.id,
            name: member.name,
        })
        .collect();

    render(
        &state,
        &session,
        "meals.html",
        context! {
            rows => rows,
            choices => MEAL_CHOICES,
            today => today.format("%A, %B %-d, %Y").to_string(),
            today_str => today.format(meals::DATE_FORMAT).to_string(),
            active => "meals",
        },
    )
    .await
}

pub async fn submit_meals(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    meals::record_daily_counts(&state.db, today(), &form).await?;
    flash::success(&session, "Today's meal records updated successfully!").await?;
    Ok(Redirect::to("/meals"))
}
