use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use metasoft_core::{DomainError, FieldErrors};
use metasoft_infra::StoreError;
use metasoft_rendering::RenderError;

/// Error surface of the application services, mapped to one consistent JSON
/// response shape.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

pub fn api_error_to_response(err: ApiError) -> axum::response::Response {
    match &err {
        ApiError::Store(StoreError::Unavailable(_)) => {
            tracing::warn!(error = %err, "store operation failed")
        }
        _ => tracing::warn!(error = %err, "request rejected"),
    }
    match err {
        ApiError::Validation(fields) => validation_response(fields),
        ApiError::Domain(e) => match e {
            DomainError::Validation(fields) => validation_response(fields),
            DomainError::InvariantViolation(msg) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
            }
            DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
            DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
            DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            DomainError::Unauthorized => {
                json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized")
            }
        },
        ApiError::Store(e) => match e {
            StoreError::Unavailable(msg) => {
                json_error(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", msg)
            }
            StoreError::Integrity(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        },
        ApiError::Render(e) => match e {
            RenderError::UnknownTemplate(_) | RenderError::UnknownPaperSize(_) => {
                json_error(StatusCode::BAD_REQUEST, "invalid_selection", e.to_string())
            }
            RenderError::InactiveCompany(_) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, "inactive_company", e.to_string())
            }
            RenderError::EmptyBody => {
                json_error(StatusCode::BAD_REQUEST, "empty_body", e.to_string())
            }
        },
    }
}

/// Validation failures carry the full field-path error map so the form can
/// mark every offending input at once.
fn validation_response(fields: FieldErrors) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": fields.to_string(),
            "fields": fields,
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
