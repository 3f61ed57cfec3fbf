// core/src/gateway/mod.rs

//! Payment gateway adapters.
//!
//! The gateway is chosen once at process start from [`GatewayConfig`] and
//! shared as `Arc<dyn PaymentGateway>`.

pub mod disabled;
pub mod razorpay;
pub mod signature;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::error::SettlementResult;

pub use disabled::DisabledGateway;
pub use razorpay::RazorpayGateway;

/// A remote order as acknowledged by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrder {
  pub id: String,
  pub amount_paise: i64,
  pub currency: String,
  pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// False when running without gateway credentials.
  fn is_enabled(&self) -> bool;

  /// Public key id the client widget needs to open checkout, if any.
  fn public_key_id(&self) -> Option<String>;

  async fn create_remote_order(&self, amount_paise: i64, currency: &str, receipt: &str) -> SettlementResult<RemoteOrder>;

  fn verify_payment_signature(
    &self,
    gateway_order_ref: &str,
    gateway_payment_ref: &str,
    signature: &str,
  ) -> SettlementResult<bool>;

  /// Verifies a notification signature over the exact raw request body.
  /// Fails with `Upstream` when notifications are not configured.
  fn verify_webhook_signature(&self, raw_body: &[u8], signature: &str) -> SettlementResult<bool>;
}

/// Picks the live adapter when credentials are present, the disabled one otherwise.
pub fn gateway_from_config(config: &GatewayConfig) -> SettlementResult<Arc<dyn PaymentGateway>> {
  if config.has_credentials() {
    Ok(Arc::new(RazorpayGateway::new(config)?))
  } else {
    Ok(Arc::new(DisabledGateway::new(config)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_credentials_select_disabled_mode() {
    let gateway = gateway_from_config(&GatewayConfig::default()).unwrap();
    assert!(!gateway.is_enabled());

    let configured = GatewayConfig {
      key_id: Some("rzp_test_abc".to_string()),
      key_secret: Some("s3cret".to_string()),
      ..GatewayConfig::default()
    };
    let gateway = gateway_from_config(&configured).unwrap();
    assert!(gateway.is_enabled());
    assert_eq!(gateway.public_key_id().as_deref(), Some("rzp_test_abc"));
  }
}
