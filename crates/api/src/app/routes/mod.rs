use axum::{Router, routing::get};

pub mod common;
pub mod companies;
pub mod invoices;
pub mod letterhead;
pub mod system;

/// Router for all authenticated (user-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/companies", companies::router())
        .nest("/invoices", invoices::router())
        .nest("/letterhead", letterhead::router())
}
