// core/src/model/records.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::ResourceRef;
use super::session::{BillingBasis, BookingQuote, DeliveryDetails, SellerGroup};
use super::status::{BookingStatus, OrderStatus, PaymentStatus};
use super::window::TimeWindow;
use crate::error::{SettlementError, SettlementResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRecord {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub title: String,
  pub quantity: i32,
  pub price_per_unit_paise: i64,
  pub total_price_paise: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub seller_id: Uuid,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub subtotal_paise: i64,
  pub delivery_charge_paise: i64,
  pub total_paise: i64,
  pub delivery_address: Option<String>,
  pub delivery_phone: Option<String>,
  pub gateway_order_ref: String,
  pub gateway_payment_ref: Option<String>,
  pub created_at: DateTime<Utc>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub items: Vec<OrderItemRecord>,
}

impl OrderRecord {
  /// Materializes a paid order from one seller group of a snapshot.
  pub fn settled_from_group(
    buyer_id: Uuid,
    group: &SellerGroup,
    delivery: &DeliveryDetails,
    gateway_order_ref: &str,
    gateway_payment_ref: &str,
    now: DateTime<Utc>,
  ) -> Self {
    let order_id = Uuid::new_v4();
    let items = group
      .lines
      .iter()
      .map(|line| OrderItemRecord {
        id: Uuid::new_v4(),
        order_id,
        product_id: line.product_id,
        title: line.title.clone(),
        quantity: line.quantity,
        price_per_unit_paise: line.unit_price_paise,
        total_price_paise: line.line_total_paise,
      })
      .collect();

    Self {
      id: order_id,
      buyer_id,
      seller_id: group.seller_id,
      status: OrderStatus::Confirmed,
      payment_status: PaymentStatus::Captured,
      subtotal_paise: group.subtotal_paise,
      delivery_charge_paise: group.delivery_charge_paise,
      total_paise: group.total_paise,
      delivery_address: delivery.address.clone(),
      delivery_phone: delivery.phone.clone(),
      gateway_order_ref: gateway_order_ref.to_string(),
      gateway_payment_ref: Some(gateway_payment_ref.to_string()),
      created_at: now,
      delivered_at: None,
      items,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub owner_id: Uuid,
  pub resource: ResourceRef,
  pub window: TimeWindow,
  pub quantity_tons: Option<i32>,
  pub billing: BillingBasis,
  pub rate_paise: i64,
  pub total_paise: i64,
  pub status: BookingStatus,
  pub payment_status: PaymentStatus,
  pub gateway_order_ref: String,
  pub gateway_payment_ref: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl BookingRecord {
  /// A freshly settled booking waits for the owner in `pending`, already paid.
  pub fn settled_from_quote(
    buyer_id: Uuid,
    quote: &BookingQuote,
    gateway_order_ref: &str,
    gateway_payment_ref: &str,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      buyer_id,
      owner_id: quote.owner_id,
      resource: quote.resource,
      window: quote.window,
      quantity_tons: quote.quantity_tons,
      billing: quote.billing,
      rate_paise: quote.rate_paise,
      total_paise: quote.total_paise,
      status: BookingStatus::Pending,
      payment_status: PaymentStatus::Captured,
      gateway_order_ref: gateway_order_ref.to_string(),
      gateway_payment_ref: Some(gateway_payment_ref.to_string()),
      created_at: now,
    }
  }

  pub fn holds(&self, resource: &ResourceRef, window: &TimeWindow) -> bool {
    self.status.is_holding() && self.resource == *resource && self.window.overlaps(window)
  }

  /// Buyers may only cancel a pending booking, and only while its start is
  /// more than `cutoff` away.
  pub fn check_cancellable(&self, now: DateTime<Utc>, cutoff: Duration) -> SettlementResult<()> {
    if self.status != BookingStatus::Pending {
      return Err(SettlementError::Conflict(format!(
        "Only pending bookings can be cancelled; this one is {}",
        self.status
      )));
    }
    if self.window.start - now <= cutoff {
      return Err(SettlementError::Validation(format!(
        "Bookings cannot be cancelled within {} hours of the start time",
        cutoff.num_hours()
      )));
    }
    Ok(())
  }
}

/// Durable records produced by (or found for) one gateway order reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledRecords {
  pub orders: Vec<OrderRecord>,
  pub bookings: Vec<BookingRecord>,
}

impl SettledRecords {
  pub fn is_empty(&self) -> bool {
    self.orders.is_empty() && self.bookings.is_empty()
  }

  pub fn total_paise(&self) -> i64 {
    self.orders.iter().map(|o| o.total_paise).sum::<i64>() + self.bookings.iter().map(|b| b.total_paise).sum::<i64>()
  }
}
