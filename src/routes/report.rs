use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::Local;
use tracing::info;

use crate::{error::AppError, pdf, router::AppState, services::report};

use super::today;

pub async fn export_pdf(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let generated_at = Local::now().naive_local();
    let report =
        report::monthly_report(&state.db, today(), &state.organization_name, generated_at).await?;
    let bytes = pdf::render_report(&report)?;
    let filename = report.filename();
    info!(%filename, members = report.rows.len(), grand_total = report.grand_total, "monthly report generated");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
