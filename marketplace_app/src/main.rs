// marketplace_app/src/main.rs

mod config;
mod db;
mod errors;
mod models;
mod state;
mod web;

use crate::config::AppConfig;
use crate::db::PgSettlementStore;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use krishi::{gateway_from_config, PaymentSessionManager};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
  tracing::error!(error = %err, "{}", context);
  io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

/// Deletes abandoned payment sessions on a fixed interval for the life of the server.
fn spawn_session_purge(manager: Arc<PaymentSessionManager>, every: Duration) {
  actix_rt::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately; skip it so startup isn't slowed.
    ticker.tick().await;
    loop {
      ticker.tick().await;
      match manager.purge_abandoned_sessions().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "Purged abandoned payment sessions."),
        Err(e) => tracing::error!(error = %e, "Abandoned session purge failed."),
      }
    }
  });
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting marketplace server...");

  let app_config = AppConfig::from_env()
    .map(Arc::new)
    .map_err(|e| startup_error("Failed to load application configuration", e))?;

  let db_pool = PgPoolOptions::new()
    .max_connections(app_config.db_max_connections)
    .connect(&app_config.database_url)
    .await
    .map_err(|e| startup_error("Failed to connect to the database", e))?;
  tracing::info!("Successfully connected to the database.");

  sqlx::migrate!("./migrations")
    .run(&db_pool)
    .await
    .map_err(|e| startup_error("Failed to run database migrations", e))?;

  let gateway =
    gateway_from_config(&app_config.gateway).map_err(|e| startup_error("Failed to build the payment gateway", e))?;
  let store = Arc::new(PgSettlementStore::new(db_pool.clone()));
  let manager = Arc::new(PaymentSessionManager::new(
    store,
    gateway,
    app_config.settlement.clone(),
  ));

  spawn_session_purge(manager.clone(), Duration::from_secs(app_config.purge_interval_secs.max(1)));

  let app_state = AppState {
    db_pool,
    manager,
    config: app_config.clone(),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
