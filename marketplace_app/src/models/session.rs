// marketplace_app/src/models/session.rs
use chrono::{DateTime, Utc};
use krishi::model::{PendingPaymentSession, Snapshot};
use krishi::{SettlementError, SettlementResult};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub gateway_order_ref: String,
  pub checkout_kind: String,
  pub currency: String,
  pub amount_paise: i64,
  pub snapshot: Json<Snapshot>,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for PendingPaymentSession {
  type Error = SettlementError;

  fn try_from(row: SessionRow) -> SettlementResult<Self> {
    let snapshot = row.snapshot.0;
    // The kind column exists for querying; it must agree with the snapshot itself.
    if snapshot.kind().as_str() != row.checkout_kind {
      return Err(SettlementError::storage(anyhow::anyhow!(
        "session {} stores kind '{}' but its snapshot is '{}'",
        row.gateway_order_ref,
        row.checkout_kind,
        snapshot.kind().as_str()
      )));
    }
    Ok(PendingPaymentSession {
      id: row.id,
      buyer_id: row.buyer_id,
      gateway_order_ref: row.gateway_order_ref,
      currency: row.currency,
      amount_paise: row.amount_paise,
      snapshot,
      created_at: row.created_at,
    })
  }
}
