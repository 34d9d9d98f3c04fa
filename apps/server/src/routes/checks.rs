use std::collections::BTreeMap;

use actix_web::{HttpResponse, get, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use pulsemon_service::database::models::UserCheckRow;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckEntry {
    check_id: i64,
    ok: bool,
    status: Option<u16>,
    latency_ms: u64,
    error: Option<String>,
    check_created_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteMetadata {
    name: String,
    created_at: DateTime<Utc>,
    is_active: bool,
}

#[derive(Serialize)]
struct SiteGroup {
    metadata: SiteMetadata,
    checks: Vec<CheckEntry>,
}

fn check_entry(row: &UserCheckRow) -> CheckEntry {
    CheckEntry {
        check_id: row.check_id,
        ok: row.ok,
        status: row.status_code,
        latency_ms: row.latency_ms,
        error: row.error.clone(),
        check_created_at: row.check_created_at,
    }
}

/// All of a user's checks, grouped by site URL for the dashboard.
#[get("/checks/{user_id}")]
pub async fn user_checks_route(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let rows = state.database.checks_for_user(user_id).await?;

    let mut sites: BTreeMap<String, SiteGroup> = BTreeMap::new();

    for row in &rows {
        let group = sites.entry(row.url.clone()).or_insert_with(|| SiteGroup {
            metadata: SiteMetadata {
                name: row.site_name.clone(),
                created_at: row.site_created_at,
                is_active: row.site_active,
            },
            checks: Vec::new(),
        });
        group.checks.push(check_entry(row));
    }

    Ok(HttpResponse::Ok().json(json!({ "sites": sites })))
}

/// Checks for one of a user's sites, newest first.
#[get("/checks/{user_id}/{site_id}")]
pub async fn site_checks_route(
    state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, site_id) = path.into_inner();
    let rows = state.database.checks_for_site(user_id, site_id).await?;
    let checks: Vec<CheckEntry> = rows.iter().map(check_entry).collect();

    Ok(HttpResponse::Ok().json(json!({ "checks": checks })))
}
