// marketplace_app/src/config.rs

use crate::errors::{AppError, Result};
use chrono::Duration;
use dotenvy::dotenv;
use krishi::{GatewayConfig, SettlementConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration as StdDuration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub db_max_connections: u32,

  /// Seconds between abandoned-session sweeps.
  pub purge_interval_secs: u64,

  pub settlement: SettlementConfig,
  pub gateway: GatewayConfig,
}

fn optional_env(var_name: &str) -> Option<String> {
  env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match optional_env(var_name) {
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
    None => Ok(default),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let server_host = optional_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parsed_env("SERVER_PORT", 8080u16)?;
    let database_url = env::var("DATABASE_URL")
      .map_err(|e| AppError::Config(format!("Missing environment variable 'DATABASE_URL': {}", e)))?;
    let db_max_connections = parsed_env("DB_MAX_CONNECTIONS", 10u32)?;
    let purge_interval_secs = parsed_env("SESSION_PURGE_INTERVAL_SECS", 3600u64)?;

    let settlement_defaults = SettlementConfig::default();
    let delivery_charge_paise = parsed_env("DELIVERY_CHARGE_PAISE", settlement_defaults.delivery_charge_paise)?;
    if delivery_charge_paise < 0 {
      return Err(AppError::Config("DELIVERY_CHARGE_PAISE must not be negative".to_string()));
    }
    let retention_hours = parsed_env("SESSION_RETENTION_HOURS", settlement_defaults.session_retention.num_hours())?;
    let settlement = SettlementConfig {
      currency: optional_env("CURRENCY").unwrap_or(settlement_defaults.currency),
      delivery_charge_paise,
      session_retention: Duration::hours(retention_hours),
      ..settlement_defaults
    };

    let gateway_defaults = GatewayConfig::default();
    let timeout_secs = parsed_env("GATEWAY_TIMEOUT_SECS", gateway_defaults.timeout.as_secs())?;
    let gateway = GatewayConfig {
      key_id: optional_env("RAZORPAY_KEY_ID"),
      key_secret: optional_env("RAZORPAY_KEY_SECRET"),
      webhook_secret: optional_env("RAZORPAY_WEBHOOK_SECRET"),
      base_url: optional_env("RAZORPAY_BASE_URL").unwrap_or(gateway_defaults.base_url),
      timeout: StdDuration::from_secs(timeout_secs),
      dev_secret: optional_env("DEV_PAYMENT_SECRET"),
    };

    tracing::info!(
      payments_enabled = gateway.has_credentials(),
      currency = %settlement.currency,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      db_max_connections,
      purge_interval_secs,
      settlement,
      gateway,
    })
  }
}
