use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use metasoft_companies::CompanyId;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(options))
        .route("/generate", post(generate))
}

/// Option lists for the letterhead form: the user's companies plus the
/// available templates and paper sizes.
pub async fn options(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.letterhead_options(user.user_id()).await {
        Ok(companies) => {
            (StatusCode::OK, Json(dto::letterhead_options_to_json(&companies))).into_response()
        }
        Err(e) => errors::api_error_to_response(e),
    }
}

pub async fn generate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Json(body): Json<dto::GenerateLetterheadRequest>,
) -> axum::response::Response {
    let company_id = match common::parse_id(&body.company_id) {
        Ok(id) => CompanyId::new(id),
        Err(resp) => return resp,
    };
    match services
        .generate_letterhead(
            user.user_id(),
            company_id,
            body.body,
            body.template.as_deref(),
            body.paper_size.as_deref(),
        )
        .await
    {
        Ok(document) => common::document_response(document),
        Err(e) => errors::api_error_to_response(e),
    }
}
