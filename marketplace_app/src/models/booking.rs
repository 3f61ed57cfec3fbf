// marketplace_app/src/models/booking.rs
use chrono::{DateTime, Utc};
use krishi::model::{BillingBasis, BookingRecord, ResourceRef, TimeWindow};
use krishi::SettlementResult;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub owner_id: Uuid,
  pub resource_kind: String,
  pub resource_id: Uuid,
  pub start_at: DateTime<Utc>,
  pub end_at: DateTime<Utc>,
  pub quantity_tons: Option<i32>,
  pub billing: Json<BillingBasis>,
  pub rate_paise: i64,
  pub total_paise: i64,
  pub status: String,
  pub payment_status: String,
  pub gateway_order_ref: String,
  pub gateway_payment_ref: Option<String>,
  pub created_at: DateTime<Utc>,
}

pub const BOOKING_COLUMNS: &str = "id, buyer_id, owner_id, resource_kind, resource_id, start_at, end_at, \
  quantity_tons, billing, rate_paise, total_paise, status, payment_status, gateway_order_ref, \
  gateway_payment_ref, created_at";

impl TryFrom<BookingRow> for BookingRecord {
  type Error = krishi::SettlementError;

  fn try_from(row: BookingRow) -> SettlementResult<Self> {
    Ok(BookingRecord {
      id: row.id,
      buyer_id: row.buyer_id,
      owner_id: row.owner_id,
      resource: ResourceRef {
        kind: row.resource_kind.parse()?,
        id: row.resource_id,
      },
      window: TimeWindow::new(row.start_at, row.end_at)?,
      quantity_tons: row.quantity_tons,
      billing: row.billing.0,
      rate_paise: row.rate_paise,
      total_paise: row.total_paise,
      status: row.status.parse()?,
      payment_status: row.payment_status.parse()?,
      gateway_order_ref: row.gateway_order_ref,
      gateway_payment_ref: row.gateway_payment_ref,
      created_at: row.created_at,
    })
  }
}
