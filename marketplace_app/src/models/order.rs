// marketplace_app/src/models/order.rs

use chrono::{DateTime, Utc};
use krishi::model::{OrderItemRecord, OrderRecord};
use krishi::SettlementResult;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub seller_id: Uuid,
  pub status: String,
  pub payment_status: String,
  pub subtotal_paise: i64,
  pub delivery_charge_paise: i64,
  pub total_paise: i64,
  pub delivery_address: Option<String>,
  pub delivery_phone: Option<String>,
  pub gateway_order_ref: String,
  pub gateway_payment_ref: Option<String>,
  pub created_at: DateTime<Utc>,
  pub delivered_at: Option<DateTime<Utc>>,
}

pub const ORDER_COLUMNS: &str = "id, buyer_id, seller_id, status, payment_status, subtotal_paise, \
  delivery_charge_paise, total_paise, delivery_address, delivery_phone, gateway_order_ref, \
  gateway_payment_ref, created_at, delivered_at";

#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRow {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub title: String,
  pub quantity: i32,
  pub price_per_unit_paise: i64,
  pub total_price_paise: i64,
}

impl From<OrderItemRow> for OrderItemRecord {
  fn from(row: OrderItemRow) -> Self {
    OrderItemRecord {
      id: row.id,
      order_id: row.order_id,
      product_id: row.product_id,
      title: row.title,
      quantity: row.quantity,
      price_per_unit_paise: row.price_per_unit_paise,
      total_price_paise: row.total_price_paise,
    }
  }
}

impl OrderRow {
  /// Builds the domain record, taking the items that belong to this order.
  pub fn into_record(self, items: &mut Vec<OrderItemRow>) -> SettlementResult<OrderRecord> {
    let (mine, rest): (Vec<_>, Vec<_>) = items.drain(..).partition(|i| i.order_id == self.id);
    *items = rest;

    Ok(OrderRecord {
      id: self.id,
      buyer_id: self.buyer_id,
      seller_id: self.seller_id,
      status: self.status.parse()?,
      payment_status: self.payment_status.parse()?,
      subtotal_paise: self.subtotal_paise,
      delivery_charge_paise: self.delivery_charge_paise,
      total_paise: self.total_paise,
      delivery_address: self.delivery_address,
      delivery_phone: self.delivery_phone,
      gateway_order_ref: self.gateway_order_ref,
      gateway_payment_ref: self.gateway_payment_ref,
      created_at: self.created_at,
      delivered_at: self.delivered_at,
      items: mine.into_iter().map(OrderItemRecord::from).collect(),
    })
  }
}
