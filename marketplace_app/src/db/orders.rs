// marketplace_app/src/db/orders.rs
use chrono::Utc;
use krishi::model::{OrderRecord, OrderStatus};
use krishi::SettlementResult;
use serde::Deserialize;
use sqlx::postgres::PgConnection;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use super::storage_error;
use crate::errors::{AppError, Result};
use crate::models::order::ORDER_COLUMNS;
use crate::models::{OrderItemRow, OrderRow};

/// A seller's move along the order workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
  Approve,
  Reject,
  Ship,
  Deliver,
}

impl OrderAction {
  pub fn target(self) -> OrderStatus {
    match self {
      OrderAction::Approve => OrderStatus::Processing,
      OrderAction::Reject => OrderStatus::Cancelled,
      OrderAction::Ship => OrderStatus::Shipped,
      OrderAction::Deliver => OrderStatus::Delivered,
    }
  }
}

/// Checks that `actor` sells this order and the move is allowed from its current status.
pub fn check_transition(order: &OrderRecord, actor: Uuid, action: OrderAction) -> Result<OrderStatus> {
  if order.seller_id != actor {
    return Err(AppError::Forbidden("Only the seller can update this order".to_string()));
  }
  let next = action.target();
  if !order.status.can_transition_to(next) {
    return Err(AppError::Conflict(format!(
      "Order {} cannot move from {} to {}",
      order.id, order.status, next
    )));
  }
  Ok(next)
}

pub(crate) async fn rows_for_ref(
  conn: &mut PgConnection,
  gateway_order_ref: &str,
  for_update: bool,
) -> SettlementResult<Vec<OrderRow>> {
  let sql = format!(
    "SELECT {} FROM orders WHERE gateway_order_ref = $1 ORDER BY created_at, id{}",
    ORDER_COLUMNS,
    if for_update { " FOR UPDATE" } else { "" }
  );
  sqlx::query_as(&sql)
    .bind(gateway_order_ref)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_error)
}

/// Loads the items of `rows` in one query and assembles domain records.
pub(crate) async fn with_items(conn: &mut PgConnection, rows: Vec<OrderRow>) -> SettlementResult<Vec<OrderRecord>> {
  if rows.is_empty() {
    return Ok(Vec::new());
  }
  let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
  let mut items: Vec<OrderItemRow> = sqlx::query_as(
    "SELECT id, order_id, product_id, title, quantity, price_per_unit_paise, total_price_paise \
     FROM order_items WHERE order_id = ANY($1) ORDER BY title, id",
  )
  .bind(&ids)
  .fetch_all(&mut *conn)
  .await
  .map_err(storage_error)?;

  rows.into_iter().map(|row| row.into_record(&mut items)).collect()
}

async fn list_where(pool: &PgPool, column: &str, party_id: Uuid) -> Result<Vec<OrderRecord>> {
  let mut conn = pool.acquire().await?;
  let sql = format!(
    "SELECT {} FROM orders WHERE {} = $1 ORDER BY created_at DESC, id",
    ORDER_COLUMNS, column
  );
  let rows: Vec<OrderRow> = sqlx::query_as(&sql).bind(party_id).fetch_all(&mut *conn).await?;
  Ok(with_items(&mut conn, rows).await?)
}

pub async fn list_for_buyer(pool: &PgPool, buyer_id: Uuid) -> Result<Vec<OrderRecord>> {
  list_where(pool, "buyer_id", buyer_id).await
}

pub async fn list_for_seller(pool: &PgPool, seller_id: Uuid) -> Result<Vec<OrderRecord>> {
  list_where(pool, "seller_id", seller_id).await
}

#[instrument(skip(pool), err(Display))]
pub async fn apply_action(pool: &PgPool, actor: Uuid, order_id: Uuid, action: OrderAction) -> Result<OrderRecord> {
  let mut tx = pool.begin().await?;

  let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
  let row: Option<OrderRow> = sqlx::query_as(&sql).bind(order_id).fetch_optional(&mut *tx).await?;
  let row = row.ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  let mut order = with_items(&mut tx, vec![row])
    .await?
    .pop()
    .ok_or_else(|| AppError::Internal(format!("Order {} vanished while loading", order_id)))?;

  let next = check_transition(&order, actor, action)?;
  order.status = next;
  if next == OrderStatus::Delivered {
    order.delivered_at = Some(Utc::now());
  }

  sqlx::query("UPDATE orders SET status = $2, delivered_at = $3 WHERE id = $1")
    .bind(order.id)
    .bind(order.status.as_str())
    .bind(order.delivered_at)
    .execute(&mut *tx)
    .await?;
  tx.commit().await?;

  info!(status = %order.status, "Order status updated.");
  Ok(order)
}
