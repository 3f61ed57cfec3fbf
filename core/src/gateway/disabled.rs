// core/src/gateway/disabled.rs
use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use super::signature::{payment_payload, verify_hex};
use super::{PaymentGateway, RemoteOrder};
use crate::config::GatewayConfig;
use crate::error::{SettlementError, SettlementResult};

/// Stand-in used when no gateway credentials are configured.
///
/// Checkout still works end to end: references are local placeholders and
/// client callbacks are signed with a development secret. Notifications are
/// refused since there is no webhook secret to check them against.
///
/// Without a configured secret a random one is drawn at construction, so no
/// secret known outside the process can sign a callback.
pub struct DisabledGateway {
  dev_secret: String,
}

impl DisabledGateway {
  pub fn new(config: &GatewayConfig) -> Self {
    warn!("Payment gateway credentials not configured. Running in payment-disabled mode.");
    let dev_secret = match config.dev_secret.as_deref().map(str::trim) {
      Some(secret) if !secret.is_empty() => {
        warn!("Client callbacks are verified against the configured development secret.");
        secret.to_string()
      }
      _ => format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
    };
    Self { dev_secret }
  }
}

#[async_trait]
impl PaymentGateway for DisabledGateway {
  fn is_enabled(&self) -> bool {
    false
  }

  fn public_key_id(&self) -> Option<String> {
    None
  }

  async fn create_remote_order(&self, amount_paise: i64, currency: &str, receipt: &str) -> SettlementResult<RemoteOrder> {
    let id = format!("order_local_{}", Uuid::new_v4().simple());
    info!(gateway_order_ref = %id, receipt, amount_paise, "Issued local placeholder order reference.");
    Ok(RemoteOrder {
      id,
      amount_paise,
      currency: currency.to_string(),
      status: "created".to_string(),
    })
  }

  fn verify_payment_signature(
    &self,
    gateway_order_ref: &str,
    gateway_payment_ref: &str,
    signature: &str,
  ) -> SettlementResult<bool> {
    verify_hex(
      self.dev_secret.as_bytes(),
      payment_payload(gateway_order_ref, gateway_payment_ref).as_bytes(),
      signature,
    )
  }

  fn verify_webhook_signature(&self, _raw_body: &[u8], _signature: &str) -> SettlementResult<bool> {
    Err(SettlementError::Upstream(
      "Webhooks are disabled: payment gateway is not configured".to_string(),
    ))
  }
}
