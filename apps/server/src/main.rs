#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};

mod error;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use error::AppError;
use logger::init_tracing;
use pulsemon_service::config::Config;
use pulsemon_service::database::{Database, LibsqlDatabase, initialize_database};
use pulsemon_service::monitoring::{CycleOrchestrator, HttpProber};
use pulsemon_service::notify::DownAlertNotifier;
use pulsemon_service::notify::email::HttpMailer;
use pulsemon_service::pool::open_pool;
use state::AppState;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config_path = std::env::var("PULSEMON_CONFIG").ok();
    let config = Config::from_config(config_path.as_deref())
        .map_err(|error| AppError::Config(format!("{error:?}")))?;

    let pool = open_pool(&config.database.path).await?;
    {
        let conn = pool.get().await.map_err(anyhow::Error::from)?;
        initialize_database(&conn).await?;
    }

    let database: Arc<dyn Database> = Arc::new(LibsqlDatabase::new_from_pool(pool));
    let prober = Arc::new(HttpProber::new(config.probe.timeout_ms)?);
    let mailer = Arc::new(HttpMailer::new(
        config.email.api_url.clone(),
        config.email.api_key.clone(),
        config.email.from.clone(),
    )?);
    let notifier = Arc::new(DownAlertNotifier::new(database.clone(), mailer));
    let orchestrator = Arc::new(CycleOrchestrator::new(
        database.clone(),
        prober,
        notifier,
        config.probe.workers,
        config.probe.include_inactive,
    ));

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let app_state = web::Data::new(AppState { database, orchestrator });

    tracing::info!(%addr, database = %config.database.path, "http server started");

    run_server(addr, app_state).await
}

async fn run_server(addr: SocketAddr, app_state: web::Data<AppState>) -> Result<(), AppError> {
    HttpServer::new(move || App::new().app_data(app_state.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
