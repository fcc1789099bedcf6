use crate::{
    auth::backend::Backend,
    config::Config,
    routes::{
        admin::{admin_action, admin_page},
        meals::{meals_page, submit_meals},
        members::{add_member, add_member_page, index},
        report::export_pdf,
    },
};
use axum::{
    Router,
    routing::{get, get_service},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{
        ExpiredDeletion, Expiry, SessionManagerLayer, SessionStore,
        cookie::{SameSite, time},
    },
};
use minijinja::Environment;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::{net::TcpListener, signal, task::AbortHandle};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub templates: Arc<Environment<'static>>,
    pub organization_name: Arc<str>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        Self {
            db,
            templates: Arc::new(setup_templates(&config.template_dir)),
            organization_name: Arc::from(config.organization_name.as_str()),
        }
    }
}

pub fn create_router<S>(state: AppState, config: &Config, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    // Auth service.
    //
    // This combines the session layer with the admin backend so handlers can
    // extract the per-session login as an `AuthSession`.
    let backend = Backend::new(&config.admin_password, &config.secret_key);
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    Router::new()
        .route("/", get(index))
        .route("/add-member", get(add_member_page).post(add_member))
        .route("/meals", get(meals_page).post(submit_meals))
        .route("/export-pdf", get(export_pdf))
        .route("/admin", get(admin_page).post(admin_action))
        .with_state(state)
        .nest_service(
            "/static",
            get_service(ServeDir::new(config.static_dir.as_str())),
        )
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http())
}

fn setup_templates(template_dir: &str) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader(template_dir.to_string()));
    env
}

/// Serves until Ctrl+C or SIGTERM, sweeping expired sessions in the
/// background meanwhile.
pub async fn serve<S>(config: &Config, db: DatabaseConnection, session_store: S) -> anyhow::Result<()>
where
    S: ExpiredDeletion + Clone,
{
    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
    );

    let state = AppState::new(db, config);
    let app = create_router(state, config, session_store);

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(deletion_task.abort_handle()))
        .await?;

    match deletion_task.await {
        Ok(result) => result?,
        Err(err) if err.is_cancelled() => {}
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

pub async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
    info!("shutting down");
}
