//! The web panel: a JSON API under `/api`, the stored payment proofs under
//! `/proofs`, and the panel's static files for everything else.

pub mod dto;
mod error;
pub mod handlers;

use std::{path::Path, sync::Arc};

use axum::{extract::DefaultBodyLimit, routing::post, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::backend::Backend;

pub use error::ErrorResponse;

/// Largest accepted `/api/submit-payment` body. The proof comes base64
/// encoded inside it.
pub const PAYMENT_BODY_LIMIT: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<Backend>,
}

pub fn router(backend: Arc<Backend>, proofs_dir: &Path, webapp_dir: &Path) -> Router {
    // The panel may be hosted somewhere else than the API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/user-status", post(handlers::user_status))
        .route(
            "/api/submit-payment",
            post(handlers::submit_payment).layer(DefaultBodyLimit::max(PAYMENT_BODY_LIMIT)),
        )
        .route("/api/pending-requests", post(handlers::pending_requests))
        .route("/api/approve-request", post(handlers::approve_request))
        .route("/api/reject-request", post(handlers::reject_request))
        .route("/api/catalogo", post(handlers::catalog))
        .route("/api/request-movie", post(handlers::request_movie))
        .route("/api/users", post(handlers::users))
        .route("/api/catalogo-admin", post(handlers::admin_catalog))
        .route("/api/add-movie", post(handlers::add_movie));

    Router::new()
        .merge(api)
        .nest_service("/proofs", ServeDir::new(proofs_dir))
        .fallback_service(ServeDir::new(webapp_dir))
        .layer(cors)
        .with_state(AppState { backend })
}
