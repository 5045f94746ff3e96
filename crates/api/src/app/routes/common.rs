use axum::http::{StatusCode, header};
use axum::response::IntoResponse;

use metasoft_core::AggregateId;
use metasoft_rendering::RenderedDocument;

use crate::app::errors;

/// Parse a path segment as an aggregate id, or produce the 400 response.
pub fn parse_id(id: &str) -> Result<AggregateId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid identifier")
    })
}

/// Serve a rendered document inline as HTML.
pub fn document_response(document: RenderedDocument) -> axum::response::Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, document.content_type())],
        document.into_html(),
    )
        .into_response()
}
