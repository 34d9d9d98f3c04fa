use actix_web::{HttpResponse, get, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use pulsemon_service::downtime::downtime_events;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertEntry {
    site_id: i64,
    url: String,
    site_name: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    duration_ms: i64,
    ongoing: bool,
}

/// Downtime timeline across all of a user's sites, newest first.
#[get("/alerts/{user_id}")]
pub async fn user_alerts_route(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let now = Utc::now();
    let mut alerts = Vec::new();

    for site in state.database.sites_for_user(user_id).await? {
        let history = state.database.check_history(site.id).await?;

        for event in downtime_events(&history, now) {
            alerts.push(AlertEntry {
                site_id: site.id,
                url: site.url.clone(),
                site_name: site.name.clone(),
                started_at: event.started_at,
                ended_at: event.ended_at,
                duration_ms: event.duration_ms,
                ongoing: event.is_ongoing(),
            });
        }
    }

    alerts.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    Ok(HttpResponse::Ok().json(json!({ "alerts": alerts })))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};
    use chrono::{Duration, Utc};
    use pulsemon_service::database::models::NewCheck;

    use super::*;
    use crate::test_support::test_state;

    #[actix_web::test]
    async fn derives_downtime_timeline_from_history() {
        let (state, _guard) = test_state().await;

        let user = state.database.insert_user("owner@example.com", "Owner").await.unwrap();
        let site = state.database.insert_site("https://one.example", "One", user.id).await.unwrap();

        let base = Utc::now() - Duration::minutes(10);
        for (minute, ok) in [(0, true), (1, false), (2, false), (3, true), (4, false)] {
            state
                .database
                .save_check(&NewCheck {
                    site_id: site.id,
                    ok,
                    status_code: if ok { Some(200) } else { None },
                    latency_ms: 30,
                    error: if ok { None } else { Some("unreachable".into()) },
                    site_active: true,
                    created_at: base + Duration::minutes(minute),
                })
                .await
                .unwrap();
        }

        let app = test::init_service(
            App::new().app_data(state.clone()).service(user_alerts_route),
        )
        .await;

        let request = test::TestRequest::get().uri(&format!("/alerts/{}", user.id)).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        let alerts = body["alerts"].as_array().unwrap();
        assert_eq!(alerts.len(), 2);
        // Newest first: the ongoing outage leads.
        assert_eq!(alerts[0]["ongoing"], true);
        assert_eq!(alerts[1]["ongoing"], false);
        assert_eq!(alerts[1]["url"], "https://one.example");
    }
}
