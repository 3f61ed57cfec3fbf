// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use krishi::gateway::signature::{sign_hex, sign_payment};
use krishi::model::{ColdStorageListing, EquipmentListing, Product};
use krishi::{
  InMemorySettlementStore, PaymentConfirmation, PaymentGateway, PaymentSessionManager, RemoteOrder, SettlementConfig,
  SettlementError, SettlementResult,
};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

// --- Helper for Tracing Setup ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Gateway double: hands out sequential references and can be told to fail.
#[derive(Default)]
pub struct FakeGateway {
  issued: AtomicUsize,
  fail_orders: AtomicBool,
}

impl FakeGateway {
  pub fn issued(&self) -> usize {
    self.issued.load(Ordering::SeqCst)
  }

  pub fn fail_orders(&self, fail: bool) {
    self.fail_orders.store(fail, Ordering::SeqCst);
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  fn is_enabled(&self) -> bool {
    true
  }

  fn public_key_id(&self) -> Option<String> {
    Some("rzp_test_fake".to_string())
  }

  async fn create_remote_order(&self, amount_paise: i64, currency: &str, _receipt: &str) -> SettlementResult<RemoteOrder> {
    if self.fail_orders.load(Ordering::SeqCst) {
      return Err(SettlementError::Upstream("gateway timed out".to_string()));
    }
    let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
    Ok(RemoteOrder {
      id: format!("order_test_{}", n),
      amount_paise,
      currency: currency.to_string(),
      status: "created".to_string(),
    })
  }

  fn verify_payment_signature(&self, order_ref: &str, payment_ref: &str, signature: &str) -> SettlementResult<bool> {
    krishi::gateway::signature::verify_hex(
      KEY_SECRET.as_bytes(),
      format!("{}|{}", order_ref, payment_ref).as_bytes(),
      signature,
    )
  }

  fn verify_webhook_signature(&self, raw_body: &[u8], signature: &str) -> SettlementResult<bool> {
    krishi::gateway::signature::verify_hex(WEBHOOK_SECRET.as_bytes(), raw_body, signature)
  }
}

pub struct Fixture {
  pub store: Arc<InMemorySettlementStore>,
  pub gateway: Arc<FakeGateway>,
  pub manager: Arc<PaymentSessionManager>,
  pub buyer: Uuid,
  pub seller: Uuid,
}

impl Fixture {
  pub fn new() -> Self {
    setup_tracing();
    let store = Arc::new(InMemorySettlementStore::new());
    let gateway = Arc::new(FakeGateway::default());
    let manager = Arc::new(PaymentSessionManager::new(
      store.clone(),
      gateway.clone(),
      SettlementConfig::default(),
    ));
    Self {
      store,
      gateway,
      manager,
      buyer: Uuid::new_v4(),
      seller: Uuid::new_v4(),
    }
  }

  pub fn product(&self, price_paise: i64, stock: i32) -> Product {
    let product = Product {
      id: Uuid::new_v4(),
      seller_id: self.seller,
      title: "Organic turmeric (1kg)".to_string(),
      price_paise,
      stock,
      active: true,
    };
    self.store.insert_product(product.clone());
    product
  }

  pub fn equipment(&self, rate_per_hour_paise: i64, rate_per_day_paise: Option<i64>) -> EquipmentListing {
    let listing = EquipmentListing {
      id: Uuid::new_v4(),
      owner_id: self.seller,
      name: "Rotavator".to_string(),
      available: true,
      rate_per_hour_paise,
      rate_per_day_paise,
    };
    self.store.insert_equipment(listing.clone());
    listing
  }

  pub fn cold_storage(&self, available_capacity_tons: i32, rate_per_ton_per_day_paise: i64) -> ColdStorageListing {
    let listing = ColdStorageListing {
      id: Uuid::new_v4(),
      owner_id: self.seller,
      name: "Kolar cold chain".to_string(),
      active: true,
      capacity_tons: available_capacity_tons,
      available_capacity_tons,
      rate_per_ton_per_day_paise,
    };
    self.store.insert_cold_storage(listing.clone());
    listing
  }
}

/// `hour`:00 UTC, `days_ahead` days from today.
pub fn day_at(days_ahead: i64, hour: u32) -> DateTime<Utc> {
  (Utc::now() + Duration::days(days_ahead))
    .date_naive()
    .and_hms_opt(hour, 0, 0)
    .unwrap()
    .and_utc()
}

/// A correctly signed client confirmation.
pub fn confirmation(gateway_order_ref: &str, gateway_payment_ref: &str) -> PaymentConfirmation {
  PaymentConfirmation {
    gateway_order_ref: gateway_order_ref.to_string(),
    gateway_payment_ref: gateway_payment_ref.to_string(),
    signature: sign_payment(KEY_SECRET, gateway_order_ref, gateway_payment_ref).unwrap(),
  }
}

pub fn webhook_body(event: &str, gateway_order_ref: &str, gateway_payment_ref: &str) -> Vec<u8> {
  serde_json::to_vec(&serde_json::json!({
    "entity": "event",
    "event": event,
    "payload": {
      "payment": {
        "entity": { "id": gateway_payment_ref, "order_id": gateway_order_ref, "status": "captured" }
      }
    }
  }))
  .unwrap()
}

pub fn webhook_signature(body: &[u8]) -> String {
  sign_hex(WEBHOOK_SECRET.as_bytes(), body).unwrap()
}
