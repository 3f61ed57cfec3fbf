// core/src/model/session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::ResourceRef;
use super::window::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutKind {
  Marketplace,
  EquipmentBooking,
  ColdStorageBooking,
}

impl CheckoutKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      CheckoutKind::Marketplace => "marketplace",
      CheckoutKind::EquipmentBooking => "equipment_booking",
      CheckoutKind::ColdStorageBooking => "cold_storage_booking",
    }
  }
}

/// What the buyer asked to pay for. Deserialized straight from the checkout body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutRequest {
  Marketplace {
    #[serde(default)]
    delivery_address: Option<String>,
    #[serde(default)]
    delivery_phone: Option<String>,
  },
  EquipmentBooking {
    equipment_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  },
  ColdStorageBooking {
    facility_id: Uuid,
    quantity_tons: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  },
}

impl CheckoutRequest {
  pub fn kind(&self) -> CheckoutKind {
    match self {
      CheckoutRequest::Marketplace { .. } => CheckoutKind::Marketplace,
      CheckoutRequest::EquipmentBooking { .. } => CheckoutKind::EquipmentBooking,
      CheckoutRequest::ColdStorageBooking { .. } => CheckoutKind::ColdStorageBooking,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
  pub address: Option<String>,
  pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLine {
  pub product_id: Uuid,
  pub title: String,
  pub quantity: i32,
  pub unit_price_paise: i64,
  pub line_total_paise: i64,
}

/// One seller's share of a marketplace checkout; becomes exactly one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerGroup {
  pub seller_id: Uuid,
  pub lines: Vec<SnapshotLine>,
  pub subtotal_paise: i64,
  pub delivery_charge_paise: i64,
  pub total_paise: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceSnapshot {
  pub seller_groups: Vec<SellerGroup>,
  pub delivery: DeliveryDetails,
}

impl MarketplaceSnapshot {
  pub fn total_paise(&self) -> i64 {
    self.seller_groups.iter().map(|g| g.total_paise).sum()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum BillingBasis {
  Hourly { seconds: i64 },
  Daily { days: i64 },
  PerTonDay { tons: i32, days: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingQuote {
  pub resource: ResourceRef,
  pub owner_id: Uuid,
  pub window: TimeWindow,
  /// Cold storage only.
  pub quantity_tons: Option<i32>,
  pub billing: BillingBasis,
  /// Rate the total was computed from (hourly, daily or per ton-day).
  pub rate_paise: i64,
  pub total_paise: i64,
}

/// Priced copy of what the buyer is paying for, frozen at checkout.
///
/// Settlement materializes records from this value alone; catalog prices that
/// change after checkout never reach a settled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snapshot {
  Marketplace(MarketplaceSnapshot),
  EquipmentBooking(BookingQuote),
  ColdStorageBooking(BookingQuote),
}

impl Snapshot {
  pub fn kind(&self) -> CheckoutKind {
    match self {
      Snapshot::Marketplace(_) => CheckoutKind::Marketplace,
      Snapshot::EquipmentBooking(_) => CheckoutKind::EquipmentBooking,
      Snapshot::ColdStorageBooking(_) => CheckoutKind::ColdStorageBooking,
    }
  }

  pub fn total_paise(&self) -> i64 {
    match self {
      Snapshot::Marketplace(snapshot) => snapshot.total_paise(),
      Snapshot::EquipmentBooking(quote) | Snapshot::ColdStorageBooking(quote) => quote.total_paise,
    }
  }

  pub fn booking_quote(&self) -> Option<&BookingQuote> {
    match self {
      Snapshot::Marketplace(_) => None,
      Snapshot::EquipmentBooking(quote) | Snapshot::ColdStorageBooking(quote) => Some(quote),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPaymentSession {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub gateway_order_ref: String,
  pub currency: String,
  pub amount_paise: i64,
  pub snapshot: Snapshot,
  pub created_at: DateTime<Utc>,
}

impl PendingPaymentSession {
  pub fn new(buyer_id: Uuid, gateway_order_ref: String, currency: String, snapshot: Snapshot, now: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      buyer_id,
      gateway_order_ref,
      currency,
      amount_paise: snapshot.total_paise(),
      snapshot,
      created_at: now,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn checkout_request_reads_tagged_json() {
    let body = serde_json::json!({
      "kind": "cold_storage_booking",
      "facility_id": "7b0c2f0e-3a5e-4a58-9d65-1f4f3e0b9a11",
      "quantity_tons": 4,
      "start": "2030-01-01T00:00:00Z",
      "end": "2030-01-03T00:00:00Z"
    });
    let request: CheckoutRequest = serde_json::from_value(body).unwrap();
    assert_eq!(request.kind(), CheckoutKind::ColdStorageBooking);

    let bare: CheckoutRequest = serde_json::from_value(serde_json::json!({ "kind": "marketplace" })).unwrap();
    assert!(matches!(bare, CheckoutRequest::Marketplace { delivery_address: None, .. }));
  }

  #[test]
  fn booking_snapshot_survives_jsonb_storage() {
    let start = Utc.with_ymd_and_hms(2030, 1, 1, 10, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2030, 1, 1, 19, 0, 0).unwrap();
    let snapshot = Snapshot::EquipmentBooking(BookingQuote {
      resource: ResourceRef::equipment(Uuid::new_v4()),
      owner_id: Uuid::new_v4(),
      window: TimeWindow::new(start, end).unwrap(),
      quantity_tons: None,
      billing: BillingBasis::Daily { days: 1 },
      rate_paise: 120_000,
      total_paise: 120_000,
    });

    let stored = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(stored["kind"], "equipment_booking");
    assert_eq!(stored["billing"]["basis"], "daily");
    let restored: Snapshot = serde_json::from_value(stored).unwrap();
    assert_eq!(restored, snapshot);
    assert_eq!(restored.total_paise(), 120_000);
  }
}
