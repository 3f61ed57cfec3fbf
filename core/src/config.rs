// core/src/config.rs

//! Plain configuration values handed to the settlement core.
//!
//! Loading them (environment, files) is the application's concern; the core
//! only sees already-validated values.

use chrono::Duration;
use std::time::Duration as StdDuration;

pub const DEFAULT_CURRENCY: &str = "INR";
/// ₹50 per seller group.
pub const DEFAULT_DELIVERY_CHARGE_PAISE: i64 = 5_000;

#[derive(Debug, Clone)]
pub struct SettlementConfig {
  pub currency: String,
  pub delivery_charge_paise: i64,
  /// Equipment rentals longer than this bill at the daily rate, when one exists.
  pub daily_rate_threshold_hours: i64,
  /// Buyers may cancel a pending booking only while its start is further away than this.
  pub cancellation_cutoff: Duration,
  /// Pending sessions older than this are considered abandoned.
  pub session_retention: Duration,
}

impl Default for SettlementConfig {
  fn default() -> Self {
    Self {
      currency: DEFAULT_CURRENCY.to_string(),
      delivery_charge_paise: DEFAULT_DELIVERY_CHARGE_PAISE,
      daily_rate_threshold_hours: 8,
      cancellation_cutoff: Duration::hours(2),
      session_retention: Duration::hours(24),
    }
  }
}

#[derive(Clone)]
pub struct GatewayConfig {
  pub key_id: Option<String>,
  pub key_secret: Option<String>,
  pub webhook_secret: Option<String>,
  pub base_url: String,
  pub timeout: StdDuration,
  /// Secret used to sign and verify client callbacks when no gateway is
  /// configured. When unset, the disabled gateway draws a random one per process.
  pub dev_secret: Option<String>,
}

impl GatewayConfig {
  pub fn has_credentials(&self) -> bool {
    matches!((&self.key_id, &self.key_secret), (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty())
  }
}

impl Default for GatewayConfig {
  fn default() -> Self {
    Self {
      key_id: None,
      key_secret: None,
      webhook_secret: None,
      base_url: "https://api.razorpay.com".to_string(),
      timeout: StdDuration::from_secs(10),
      dev_secret: None,
    }
  }
}

// Secrets stay out of logs.
impl std::fmt::Debug for GatewayConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GatewayConfig")
      .field("key_id", &self.key_id)
      .field("key_secret", &self.key_secret.as_ref().map(|_| "[REDACTED]"))
      .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
      .field("base_url", &self.base_url)
      .field("timeout", &self.timeout)
      .field("dev_secret", &self.dev_secret.as_ref().map(|_| "[REDACTED]"))
      .finish()
  }
}
