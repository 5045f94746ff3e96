//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: store wiring and the invoice/letterhead workflows
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware::{self, SessionStore};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(sessions: SessionStore) -> Router {
    let auth_state = middleware::AuthState { sessions };

    let app_services = Arc::new(services::build_services().await);
    build_app_with_services(auth_state, app_services)
}

/// Router assembly with injected services; tests use this to run against an
/// in-memory store with known sessions.
pub fn build_app_with_services(
    auth_state: middleware::AuthState,
    app_services: Arc<services::AppServices>,
) -> Router {
    // Protected routes: require a resolved session.
    let protected = routes::router()
        .layer(Extension(app_services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
