use actix_web::{HttpResponse, post, web};
use serde::Deserialize;
use serde_json::json;

use pulsemon_service::validation::validate_site_url;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSite {
    pub url: String,
    pub name: String,
    pub user_id: i64,
}

/// Register a site for monitoring.
///
/// Idempotent on URL: re-posting an already-registered URL returns the
/// existing row untouched.
#[post("/sites")]
pub async fn register_site_route(
    state: web::Data<AppState>,
    body: web::Json<RegisterSite>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let validated = validate_site_url(&body.url);
    if !validated.is_valid {
        return Err(AppError::BadRequest(
            validated.error.unwrap_or_else(|| "invalid URL".to_string()),
        ));
    }

    let site = state.database.insert_site(&body.url, &body.name, body.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "site": site })))
}
