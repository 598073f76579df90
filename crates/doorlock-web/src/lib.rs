//! Admin web app: enroll identities, list and delete them, browse the
//! access log with its capture snapshots.

pub mod config;
pub mod error;
mod routes;
pub mod views;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Upper bound on a registration upload; phone photos run well past axum's 2 MB default.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub struct AppState {
    pub db: tokio_rusqlite::Connection,
    pub known_faces_dir: PathBuf,
    pub capture_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    let captures = ServeDir::new(&state.capture_dir);
    Router::new()
        .route("/", get(routes::index))
        .route(
            "/register",
            post(routes::register).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/logs", get(routes::logs))
        .route("/users", get(routes::users))
        .route("/delete_user/{id}", post(routes::delete_user))
        .nest_service("/captures", captures)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
