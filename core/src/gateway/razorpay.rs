// core/src/gateway/razorpay.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::signature::{payment_payload, verify_hex};
use super::{PaymentGateway, RemoteOrder};
use crate::config::GatewayConfig;
use crate::error::{SettlementError, SettlementResult};

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
  amount: i64,
  currency: &'a str,
  receipt: &'a str,
  payment_capture: u8,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
  id: String,
  amount: i64,
  currency: String,
  status: String,
}

pub struct RazorpayGateway {
  client: Client,
  base_url: String,
  key_id: String,
  key_secret: String,
  webhook_secret: Option<String>,
}

impl RazorpayGateway {
  pub fn new(config: &GatewayConfig) -> SettlementResult<Self> {
    let (Some(key_id), Some(key_secret)) = (config.key_id.clone(), config.key_secret.clone()) else {
      return Err(SettlementError::Validation(
        "Razorpay key id and secret are required".to_string(),
      ));
    };
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| SettlementError::Upstream(format!("Failed to build gateway HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      key_id,
      key_secret,
      webhook_secret: config.webhook_secret.clone().filter(|s| !s.is_empty()),
    })
  }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
  fn is_enabled(&self) -> bool {
    true
  }

  fn public_key_id(&self) -> Option<String> {
    Some(self.key_id.clone())
  }

  #[instrument(name = "razorpay::create_order", skip(self), err(Display))]
  async fn create_remote_order(&self, amount_paise: i64, currency: &str, receipt: &str) -> SettlementResult<RemoteOrder> {
    let request = CreateOrderRequest {
      amount: amount_paise,
      currency,
      receipt,
      payment_capture: 1,
    };

    let response = self
      .client
      .post(format!("{}/v1/orders", self.base_url))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(&request)
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          SettlementError::Upstream("Payment gateway timed out".to_string())
        } else {
          SettlementError::Upstream(format!("Payment gateway unreachable: {}", e))
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      let error_text = response.text().await.unwrap_or_default();
      error!(%status, body = %error_text, "Razorpay rejected order creation.");
      return Err(SettlementError::Upstream(format!(
        "Payment gateway returned {}",
        status
      )));
    }

    let order: CreateOrderResponse = response
      .json()
      .await
      .map_err(|e| SettlementError::Upstream(format!("Failed to parse gateway response: {}", e)))?;

    info!(gateway_order_ref = %order.id, "Razorpay order created.");
    Ok(RemoteOrder {
      id: order.id,
      amount_paise: order.amount,
      currency: order.currency,
      status: order.status,
    })
  }

  fn verify_payment_signature(
    &self,
    gateway_order_ref: &str,
    gateway_payment_ref: &str,
    signature: &str,
  ) -> SettlementResult<bool> {
    verify_hex(
      self.key_secret.as_bytes(),
      payment_payload(gateway_order_ref, gateway_payment_ref).as_bytes(),
      signature,
    )
  }

  fn verify_webhook_signature(&self, raw_body: &[u8], signature: &str) -> SettlementResult<bool> {
    let secret = self
      .webhook_secret
      .as_ref()
      .ok_or_else(|| SettlementError::Upstream("Webhooks are disabled: no webhook secret configured".to_string()))?;
    verify_hex(secret.as_bytes(), raw_body, signature)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gateway::signature::{sign_hex, sign_payment};

  fn config(webhook_secret: Option<&str>) -> GatewayConfig {
    GatewayConfig {
      key_id: Some("rzp_test_key".to_string()),
      key_secret: Some("key_secret".to_string()),
      webhook_secret: webhook_secret.map(str::to_string),
      ..GatewayConfig::default()
    }
  }

  #[test]
  fn payment_signature_uses_key_secret() {
    let gateway = RazorpayGateway::new(&config(None)).unwrap();
    let good = sign_payment("key_secret", "order_X", "pay_Y").unwrap();
    let forged = sign_payment("guess", "order_X", "pay_Y").unwrap();
    assert!(gateway.verify_payment_signature("order_X", "pay_Y", &good).unwrap());
    assert!(!gateway.verify_payment_signature("order_X", "pay_Y", &forged).unwrap());
  }

  #[test]
  fn webhook_signature_covers_raw_bytes() {
    let gateway = RazorpayGateway::new(&config(Some("hook_secret"))).unwrap();
    let body = br#"{"event":"payment.captured"}"#;
    let sig = sign_hex(b"hook_secret", body).unwrap();
    assert!(gateway.verify_webhook_signature(body, &sig).unwrap());
    // Same JSON, different bytes.
    assert!(!gateway
      .verify_webhook_signature(br#"{ "event": "payment.captured" }"#, &sig)
      .unwrap());
  }

  #[test]
  fn webhook_without_secret_is_disabled() {
    let gateway = RazorpayGateway::new(&config(None)).unwrap();
    assert!(matches!(
      gateway.verify_webhook_signature(b"{}", "x"),
      Err(SettlementError::Upstream(_))
    ));
  }

  #[tokio::test]
  async fn unreachable_gateway_is_upstream_error() {
    let gateway = RazorpayGateway::new(&GatewayConfig {
      base_url: "http://127.0.0.1:9".to_string(),
      timeout: std::time::Duration::from_millis(500),
      ..config(None)
    })
    .unwrap();
    let err = gateway.create_remote_order(100, "INR", "rcpt").await.unwrap_err();
    assert!(matches!(err, SettlementError::Upstream(_)));
  }
}
