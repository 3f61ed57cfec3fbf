// marketplace_app/src/state.rs
use crate::config::AppConfig;
use krishi::PaymentSessionManager;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub manager: Arc<PaymentSessionManager>,
  pub config: Arc<AppConfig>,
}
