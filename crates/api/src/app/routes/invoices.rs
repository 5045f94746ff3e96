use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use metasoft_invoicing::{InvoiceDraft, InvoiceId};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(save_invoice).get(list_invoices))
        .route("/draft", post(new_draft))
        .route("/:id", get(get_invoice))
        .route("/:id/document", get(invoice_document))
        .route("/:id/status", post(set_status))
}

/// Start a new draft, pre-filled from the user's default company. The draft
/// is returned to the client; nothing is stored.
pub async fn new_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.new_draft(user.user_id()).await {
        Ok(draft) => (StatusCode::OK, Json(draft)).into_response(),
        Err(e) => errors::api_error_to_response(e),
    }
}

/// Validate the submitted draft and persist it as an invoice.
pub async fn save_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Json(draft): Json<InvoiceDraft>,
) -> axum::response::Response {
    match services.save_invoice(user.user_id(), &draft).await {
        Ok(invoice) => {
            (StatusCode::CREATED, Json(dto::invoice_to_json(&invoice))).into_response()
        }
        Err(e) => errors::api_error_to_response(e),
    }
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.list_invoices(user.user_id()).await {
        Ok(invoices) => {
            let items = invoices.iter().map(dto::invoice_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::api_error_to_response(e),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match common::parse_id(&id) {
        Ok(id) => InvoiceId::new(id),
        Err(resp) => return resp,
    };
    match services.get_invoice(user.user_id(), id).await {
        Ok(invoice) => (StatusCode::OK, Json(dto::invoice_to_json(&invoice))).into_response(),
        Err(e) => errors::api_error_to_response(e),
    }
}

/// Render the invoice as an HTML document. Template and paper size default to
/// the issuing company's preferences.
pub async fn invoice_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::DocumentQuery>,
) -> axum::response::Response {
    let id = match common::parse_id(&id) {
        Ok(id) => InvoiceId::new(id),
        Err(resp) => return resp,
    };
    match services
        .render_invoice_document(
            user.user_id(),
            id,
            query.template.as_deref(),
            query.paper_size.as_deref(),
        )
        .await
    {
        Ok(document) => common::document_response(document),
        Err(e) => errors::api_error_to_response(e),
    }
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetStatusRequest>,
) -> axum::response::Response {
    let id = match common::parse_id(&id) {
        Ok(id) => InvoiceId::new(id),
        Err(resp) => return resp,
    };
    match services
        .transition_invoice(user.user_id(), id, &body.status)
        .await
    {
        Ok(invoice) => (StatusCode::OK, Json(dto::invoice_to_json(&invoice))).into_response(),
        Err(e) => errors::api_error_to_response(e),
    }
}
