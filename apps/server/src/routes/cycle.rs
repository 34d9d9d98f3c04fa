use actix_web::{HttpResponse, post, web};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// Trigger one probe cycle.
///
/// Per-site failures still complete the cycle and return 200; only an
/// unreadable roster surfaces as a server error.
#[post("/cycle")]
pub async fn run_cycle_route(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let summary = state.orchestrator.run_cycle().await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "cycle completed",
        "attempted": summary.attempted,
        "succeeded": summary.succeeded,
        "failed": summary.failed,
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};

    use super::*;
    use crate::test_support::test_state;

    #[actix_web::test]
    async fn completed_cycle_reports_counts() {
        let (state, _guard) = test_state().await;

        let user = state.database.insert_user("owner@example.com", "Owner").await.unwrap();
        state.database.insert_site("https://one.example", "One", user.id).await.unwrap();
        state.database.insert_site("https://two.example", "Two", user.id).await.unwrap();

        let app = test::init_service(
            App::new().app_data(state.clone()).service(run_cycle_route),
        )
        .await;

        let request = test::TestRequest::post().uri("/cycle").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(body["message"], "cycle completed");
        assert_eq!(body["attempted"], 2);
        assert_eq!(body["succeeded"], 2);
        assert_eq!(body["failed"], 0);
    }
}
