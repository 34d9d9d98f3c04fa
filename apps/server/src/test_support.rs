use std::sync::Arc;

use actix_web::web;
use tempfile::TempDir;

use pulsemon_service::database::{Database, LibsqlDatabase, initialize_database};
use pulsemon_service::monitoring::{CycleOrchestrator, Prober, ProbeOutcome};
use pulsemon_service::notify::DownAlertNotifier;
use pulsemon_service::notify::email::HttpMailer;
use pulsemon_service::pool::open_pool;

use crate::state::AppState;

/// Prober that always reports a healthy response, so route tests never
/// touch the network.
struct StaticProber;

#[async_trait::async_trait]
impl Prober for StaticProber {
    async fn probe(&self, _url: &str) -> ProbeOutcome {
        ProbeOutcome::Completed { status_code: 200, latency_ms: 5 }
    }
}

/// Fresh app state over a temp-dir database. The guard keeps the backing
/// directory alive for the test.
pub async fn test_state() -> (web::Data<AppState>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let pool = open_pool(&db_path.to_string_lossy()).await.unwrap();
    {
        let conn = pool.get().await.unwrap();
        initialize_database(&conn).await.unwrap();
    }

    let database: Arc<dyn Database> = Arc::new(LibsqlDatabase::new_from_pool(pool));
    let prober = Arc::new(StaticProber);
    // Points at a closed port; tests never dispatch mail.
    let mailer = Arc::new(
        HttpMailer::new("http://127.0.0.1:9/emails".into(), String::new(), "test@test".into())
            .unwrap(),
    );
    let notifier = Arc::new(DownAlertNotifier::new(database.clone(), mailer));
    let orchestrator =
        Arc::new(CycleOrchestrator::new(database.clone(), prober, notifier, 4, false));

    (web::Data::new(AppState { database, orchestrator }), dir)
}
