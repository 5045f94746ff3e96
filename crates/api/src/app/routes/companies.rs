use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
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
        .route("/", post(create_company).get(list_companies))
        .route("/:id", get(get_company).put(update_company).delete(delete_company))
        .route("/:id/default", post(set_default_company))
}

pub async fn create_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Json(body): Json<dto::UpsertCompanyRequest>,
) -> axum::response::Response {
    match services.create_company(user.user_id(), body.form).await {
        Ok(company) => {
            (StatusCode::CREATED, Json(dto::company_to_json(&company))).into_response()
        }
        Err(e) => errors::api_error_to_response(e),
    }
}

pub async fn list_companies(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.list_companies(user.user_id()).await {
        Ok(companies) => {
            let items = companies.iter().map(dto::company_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::api_error_to_response(e),
    }
}

pub async fn get_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match common::parse_id(&id) {
        Ok(id) => CompanyId::new(id),
        Err(resp) => return resp,
    };
    match services.get_company(user.user_id(), id).await {
        Ok(company) => (StatusCode::OK, Json(dto::company_to_json(&company))).into_response(),
        Err(e) => errors::api_error_to_response(e),
    }
}

pub async fn update_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpsertCompanyRequest>,
) -> axum::response::Response {
    let id = match common::parse_id(&id) {
        Ok(id) => CompanyId::new(id),
        Err(resp) => return resp,
    };
    match services
        .update_company(user.user_id(), id, body.form, body.is_active)
        .await
    {
        Ok(company) => (StatusCode::OK, Json(dto::company_to_json(&company))).into_response(),
        Err(e) => errors::api_error_to_response(e),
    }
}

pub async fn set_default_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match common::parse_id(&id) {
        Ok(id) => CompanyId::new(id),
        Err(resp) => return resp,
    };
    match services.set_default_company(user.user_id(), id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "id": id.to_string() })))
            .into_response(),
        Err(e) => errors::api_error_to_response(e),
    }
}

pub async fn delete_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match common::parse_id(&id) {
        Ok(id) => CompanyId::new(id),
        Err(resp) => return resp,
    };
    match services.delete_company(user.user_id(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::api_error_to_response(e),
    }
}
