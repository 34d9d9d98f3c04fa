use std::sync::Arc;

use pulsemon_service::database::Database;
use pulsemon_service::monitoring::CycleOrchestrator;

/// Shared handles for the route handlers.
pub struct AppState {
    pub database: Arc<dyn Database>,
    pub orchestrator: Arc<CycleOrchestrator>,
}
