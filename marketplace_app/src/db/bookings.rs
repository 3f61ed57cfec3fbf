// marketplace_app/src/db/bookings.rs
use chrono::{Duration, Utc};
use krishi::model::{BookingRecord, BookingStatus};
use krishi::SettlementResult;
use sqlx::postgres::PgConnection;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use super::storage_error;
use crate::errors::{AppError, Result};
use crate::models::booking::BOOKING_COLUMNS;
use crate::models::BookingRow;

fn into_records(rows: Vec<BookingRow>) -> SettlementResult<Vec<BookingRecord>> {
  rows.into_iter().map(BookingRecord::try_from).collect()
}

pub(crate) async fn for_ref(
  conn: &mut PgConnection,
  gateway_order_ref: &str,
  for_update: bool,
) -> SettlementResult<Vec<BookingRecord>> {
  let sql = format!(
    "SELECT {} FROM bookings WHERE gateway_order_ref = $1 ORDER BY created_at, id{}",
    BOOKING_COLUMNS,
    if for_update { " FOR UPDATE" } else { "" }
  );
  let rows: Vec<BookingRow> = sqlx::query_as(&sql)
    .bind(gateway_order_ref)
    .fetch_all(&mut *conn)
    .await
    .map_err(storage_error)?;
  into_records(rows)
}

pub async fn list_for_buyer(pool: &PgPool, buyer_id: Uuid) -> Result<Vec<BookingRecord>> {
  let sql = format!(
    "SELECT {} FROM bookings WHERE buyer_id = $1 ORDER BY start_at DESC, id",
    BOOKING_COLUMNS
  );
  let rows: Vec<BookingRow> = sqlx::query_as(&sql).bind(buyer_id).fetch_all(pool).await?;
  Ok(into_records(rows)?)
}

/// Resource owner accepts a paid booking.
pub fn check_confirm(booking: &BookingRecord, actor: Uuid) -> Result<()> {
  if booking.owner_id != actor {
    return Err(AppError::Forbidden("Only the resource owner can confirm this booking".to_string()));
  }
  if booking.status != BookingStatus::Pending {
    return Err(AppError::Conflict(format!(
      "Booking {} is {} and cannot be confirmed",
      booking.id, booking.status
    )));
  }
  Ok(())
}

pub fn check_cancel(booking: &BookingRecord, actor: Uuid, cutoff: Duration) -> Result<()> {
  if booking.buyer_id != actor {
    return Err(AppError::Forbidden("Only the buyer can cancel this booking".to_string()));
  }
  booking.check_cancellable(Utc::now(), cutoff)?;
  Ok(())
}

async fn update_status<F>(pool: &PgPool, booking_id: Uuid, next: BookingStatus, check: F) -> Result<BookingRecord>
where
  F: FnOnce(&BookingRecord) -> Result<()>,
{
  let mut tx = pool.begin().await?;

  let sql = format!("SELECT {} FROM bookings WHERE id = $1 FOR UPDATE", BOOKING_COLUMNS);
  let row: Option<BookingRow> = sqlx::query_as(&sql).bind(booking_id).fetch_optional(&mut *tx).await?;
  let mut booking = match row {
    Some(row) => BookingRecord::try_from(row)?,
    None => return Err(AppError::NotFound(format!("Booking {} not found", booking_id))),
  };

  check(&booking)?;
  booking.status = next;

  sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
    .bind(booking.id)
    .bind(booking.status.as_str())
    .execute(&mut *tx)
    .await?;
  tx.commit().await?;

  info!(status = %booking.status, "Booking status updated.");
  Ok(booking)
}

#[instrument(skip(pool), err(Display))]
pub async fn confirm(pool: &PgPool, actor: Uuid, booking_id: Uuid) -> Result<BookingRecord> {
  update_status(pool, booking_id, BookingStatus::Confirmed, |b| check_confirm(b, actor)).await
}

#[instrument(skip(pool, cutoff), err(Display))]
pub async fn cancel(pool: &PgPool, actor: Uuid, booking_id: Uuid, cutoff: Duration) -> Result<BookingRecord> {
  update_status(pool, booking_id, BookingStatus::Cancelled, |b| check_cancel(b, actor, cutoff)).await
}
