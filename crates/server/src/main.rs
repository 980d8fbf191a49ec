use std::{net::SocketAddr, sync::Arc};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use server_api::{ApiContext, SessionKeys};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod error;
mod form;
mod handlers;
mod session;

use app_state::AppState;
use config::{load_settings, prepare_database_url};
use handlers::*;

const MAX_FORM_BYTES: usize = 256 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    if settings.uses_dev_secret() {
        warn!("SESSION_SECRET is not set; using the development secret");
    }
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext {
        storage,
        sessions: SessionKeys::new(settings.session_secret.as_bytes(), settings.session_ttl_seconds),
    };

    let state = AppState {
        api,
        secure_cookies: settings.secure_cookies,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let staff = Router::new()
        .route("/register", post(register))
        .route("/users/list", get(list_users))
        .route("/users/delete/:phone", get(delete_user).delete(delete_user))
        .route("/users/info/:phone", get(user_details))
        .route("/users/resident/info", get(resident_houses))
        .route(
            "/users/resident/remove-house",
            get(remove_resident_house).delete(remove_resident_house),
        )
        .route("/users/resident/add-house", post(add_resident_house))
        .route("/users/resident/update-house", post(update_house_address))
        .route("/users/resident/get-number", get(resident_phone))
        .route("/users/staff/info", get(staff_specializations))
        .route(
            "/users/staff/delete-spec",
            get(deactivate_staff_specialization).delete(deactivate_staff_specialization),
        )
        .route("/users/staff/add-specialization", post(add_staff_specialization))
        .route("/organizations/list", get(list_organizations))
        .route("/organizations/create", post(create_organization))
        .route("/organizations/update", post(update_organization))
        .route("/specializations/list", get(list_specializations))
        .route("/specializations/create", post(create_specialization))
        .route("/houses/list", get(list_houses))
        .route("/houses/create", post(create_house))
        .route("/requests/panel", get(request_panel))
        .route("/requests/panel/update", post(update_request))
        .route("/requests/panel/update/random-assign", get(least_busy))
        .route("/requests/panel/delete/:id", get(delete_request).delete(delete_request))
        .route_layer(middleware::from_fn_with_state(state.clone(), session::require_staff));

    let resident = Router::new()
        .route("/requests", get(resident_requests))
        .route("/create-request", post(create_request))
        .route_layer(middleware::from_fn_with_state(state.clone(), session::require_resident));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/logout", get(session::logout))
        .route("/api/login", post(login))
        .nest("/api/staff", staff)
        .nest("/api/resident", resident)
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
