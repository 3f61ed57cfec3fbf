// marketplace_app/src/db/settlement_store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use krishi::model::{
  BookingRecord, BookingStatus, ColdStorageListing, EquipmentListing, OrderRecord, PendingPaymentSession,
  PricedCartLine, ResourceRef, SettledRecords, TimeWindow,
};
use krishi::{CommitOutcome, SettlementError, SettlementResult, SettlementStore};
use sqlx::postgres::PgConnection;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{is_exclusion_violation, is_unique_violation, storage_error};
use crate::db::{bookings, orders};
use crate::models::{CartLineRow, ColdStorageRow, EquipmentRow, OrderRow, SessionRow};

/// Settlement store over the application's Postgres schema.
///
/// Every commit runs in one transaction whose first statement deletes the
/// pending session. A transaction dropped on an early return rolls back.
#[derive(Clone)]
pub struct PgSettlementStore {
  pool: PgPool,
}

impl PgSettlementStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

pub(crate) fn holding_statuses() -> Vec<String> {
  BookingStatus::holding().iter().map(|s| s.as_str().to_string()).collect()
}

/// Deletes the buyer's session for the reference. `false` means another
/// caller consumed it first, or it never belonged to this buyer.
async fn consume_session(conn: &mut PgConnection, buyer_id: Uuid, gateway_order_ref: &str) -> SettlementResult<bool> {
  let consumed: Option<(Uuid,)> =
    sqlx::query_as("DELETE FROM payment_sessions WHERE gateway_order_ref = $1 AND buyer_id = $2 RETURNING id")
      .bind(gateway_order_ref)
      .bind(buyer_id)
      .fetch_optional(&mut *conn)
      .await
      .map_err(storage_error)?;
  Ok(consumed.is_some())
}

async fn window_taken_on(conn: &mut PgConnection, resource: &ResourceRef, window: &TimeWindow) -> SettlementResult<bool> {
  let (taken,): (bool,) = sqlx::query_as(
    "SELECT EXISTS (SELECT 1 FROM bookings WHERE resource_kind = $1 AND resource_id = $2 \
     AND status = ANY($3) AND start_at < $5 AND end_at > $4)",
  )
  .bind(resource.kind.as_str())
  .bind(resource.id)
  .bind(holding_statuses())
  .bind(window.start)
  .bind(window.end)
  .fetch_one(&mut *conn)
  .await
  .map_err(storage_error)?;
  Ok(taken)
}

async fn insert_order(conn: &mut PgConnection, order: &OrderRecord) -> SettlementResult<()> {
  sqlx::query(
    "INSERT INTO orders (id, buyer_id, seller_id, status, payment_status, subtotal_paise, delivery_charge_paise, \
     total_paise, delivery_address, delivery_phone, gateway_order_ref, gateway_payment_ref, created_at, delivered_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
  )
  .bind(order.id)
  .bind(order.buyer_id)
  .bind(order.seller_id)
  .bind(order.status.as_str())
  .bind(order.payment_status.as_str())
  .bind(order.subtotal_paise)
  .bind(order.delivery_charge_paise)
  .bind(order.total_paise)
  .bind(order.delivery_address.as_deref())
  .bind(order.delivery_phone.as_deref())
  .bind(&order.gateway_order_ref)
  .bind(order.gateway_payment_ref.as_deref())
  .bind(order.created_at)
  .bind(order.delivered_at)
  .execute(&mut *conn)
  .await
  .map_err(storage_error)?;

  for item in &order.items {
    sqlx::query(
      "INSERT INTO order_items (id, order_id, product_id, title, quantity, price_per_unit_paise, total_price_paise) \
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(item.id)
    .bind(item.order_id)
    .bind(item.product_id)
    .bind(&item.title)
    .bind(item.quantity)
    .bind(item.price_per_unit_paise)
    .bind(item.total_price_paise)
    .execute(&mut *conn)
    .await
    .map_err(storage_error)?;
  }
  Ok(())
}

async fn insert_booking(conn: &mut PgConnection, booking: &BookingRecord) -> Result<(), sqlx::Error> {
  sqlx::query(
    "INSERT INTO bookings (id, buyer_id, owner_id, resource_kind, resource_id, start_at, end_at, quantity_tons, \
     billing, rate_paise, total_paise, status, payment_status, gateway_order_ref, gateway_payment_ref, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
  )
  .bind(booking.id)
  .bind(booking.buyer_id)
  .bind(booking.owner_id)
  .bind(booking.resource.kind.as_str())
  .bind(booking.resource.id)
  .bind(booking.window.start)
  .bind(booking.window.end)
  .bind(booking.quantity_tons)
  .bind(Json(&booking.billing))
  .bind(booking.rate_paise)
  .bind(booking.total_paise)
  .bind(booking.status.as_str())
  .bind(booking.payment_status.as_str())
  .bind(&booking.gateway_order_ref)
  .bind(booking.gateway_payment_ref.as_deref())
  .bind(booking.created_at)
  .execute(&mut *conn)
  .await?;
  Ok(())
}

/// `false` when the exclusion constraint found a holding booking on an
/// overlapping window. The transaction is aborted in that case and must be
/// dropped, which also restores the consumed session.
async fn try_insert_booking(conn: &mut PgConnection, booking: &BookingRecord) -> SettlementResult<bool> {
  match insert_booking(conn, booking).await {
    Ok(()) => Ok(true),
    Err(e) if is_exclusion_violation(&e) => Ok(false),
    Err(e) => Err(storage_error(e)),
  }
}

#[async_trait]
impl SettlementStore for PgSettlementStore {
  async fn priced_cart(&self, buyer_id: Uuid) -> SettlementResult<Vec<PricedCartLine>> {
    let rows: Vec<CartLineRow> = sqlx::query_as(
      "SELECT c.id AS line_id, c.quantity, p.id AS product_id, p.seller_id, p.title, p.price_paise, p.stock, p.active \
       FROM cart_items c JOIN products p ON p.id = c.product_id \
       WHERE c.buyer_id = $1 ORDER BY c.added_at, c.id",
    )
    .bind(buyer_id)
    .fetch_all(&self.pool)
    .await
    .map_err(storage_error)?;
    Ok(rows.into_iter().map(PricedCartLine::from).collect())
  }

  async fn equipment(&self, equipment_id: Uuid) -> SettlementResult<Option<EquipmentListing>> {
    let row: Option<EquipmentRow> = sqlx::query_as(
      "SELECT id, owner_id, name, available, rate_per_hour_paise, rate_per_day_paise FROM equipment WHERE id = $1",
    )
    .bind(equipment_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(storage_error)?;
    Ok(row.map(EquipmentListing::from))
  }

  async fn cold_storage(&self, facility_id: Uuid) -> SettlementResult<Option<ColdStorageListing>> {
    let row: Option<ColdStorageRow> = sqlx::query_as(
      "SELECT id, owner_id, name, active, capacity_tons, available_capacity_tons, rate_per_ton_per_day_paise \
       FROM cold_storage_facilities WHERE id = $1",
    )
    .bind(facility_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(storage_error)?;
    Ok(row.map(ColdStorageListing::from))
  }

  async fn window_is_taken(&self, resource: ResourceRef, window: TimeWindow) -> SettlementResult<bool> {
    let mut conn = self.pool.acquire().await.map_err(storage_error)?;
    window_taken_on(&mut conn, &resource, &window).await
  }

  async fn insert_session(&self, session: &PendingPaymentSession) -> SettlementResult<()> {
    sqlx::query(
      "INSERT INTO payment_sessions (id, buyer_id, gateway_order_ref, checkout_kind, currency, amount_paise, snapshot, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(session.id)
    .bind(session.buyer_id)
    .bind(&session.gateway_order_ref)
    .bind(session.snapshot.kind().as_str())
    .bind(&session.currency)
    .bind(session.amount_paise)
    .bind(Json(&session.snapshot))
    .bind(session.created_at)
    .execute(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        SettlementError::Conflict(format!(
          "Payment session for {} already exists",
          session.gateway_order_ref
        ))
      } else {
        storage_error(e)
      }
    })?;
    Ok(())
  }

  async fn find_session(
    &self,
    gateway_order_ref: &str,
    buyer_id: Option<Uuid>,
  ) -> SettlementResult<Option<PendingPaymentSession>> {
    let row: Option<SessionRow> = sqlx::query_as(
      "SELECT id, buyer_id, gateway_order_ref, checkout_kind, currency, amount_paise, snapshot, created_at \
       FROM payment_sessions WHERE gateway_order_ref = $1 AND ($2::uuid IS NULL OR buyer_id = $2)",
    )
    .bind(gateway_order_ref)
    .bind(buyer_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(storage_error)?;
    row.map(PendingPaymentSession::try_from).transpose()
  }

  async fn discard_session(&self, gateway_order_ref: &str) -> SettlementResult<bool> {
    let result = sqlx::query("DELETE FROM payment_sessions WHERE gateway_order_ref = $1")
      .bind(gateway_order_ref)
      .execute(&self.pool)
      .await
      .map_err(storage_error)?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(skip(self, orders), fields(order_count = orders.len()), err(Display))]
  async fn commit_marketplace(
    &self,
    buyer_id: Uuid,
    gateway_order_ref: &str,
    orders: Vec<OrderRecord>,
  ) -> SettlementResult<CommitOutcome<Vec<OrderRecord>>> {
    let mut tx = self.pool.begin().await.map_err(storage_error)?;

    if !consume_session(&mut tx, buyer_id, gateway_order_ref).await? {
      debug!("Session already consumed; rolling back.");
      return Ok(CommitOutcome::SessionMissing);
    }

    for order in &orders {
      insert_order(&mut tx, order).await?;
    }

    sqlx::query("DELETE FROM cart_items WHERE buyer_id = $1")
      .bind(buyer_id)
      .execute(&mut *tx)
      .await
      .map_err(storage_error)?;

    tx.commit().await.map_err(storage_error)?;
    Ok(CommitOutcome::Committed(orders))
  }

  #[instrument(skip(self, booking), fields(resource = %booking.resource), err(Display))]
  async fn commit_booking(
    &self,
    buyer_id: Uuid,
    gateway_order_ref: &str,
    booking: BookingRecord,
  ) -> SettlementResult<CommitOutcome<BookingRecord>> {
    let mut tx = self.pool.begin().await.map_err(storage_error)?;

    // Serializes settlements of the same resource until this transaction ends.
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
      .bind(booking.resource.to_string())
      .execute(&mut *tx)
      .await
      .map_err(storage_error)?;

    if !consume_session(&mut tx, buyer_id, gateway_order_ref).await? {
      debug!("Session already consumed; rolling back.");
      return Ok(CommitOutcome::SessionMissing);
    }

    if window_taken_on(&mut tx, &booking.resource, &booking.window).await? {
      warn!("Window taken at settlement; session kept.");
      tx.rollback().await.map_err(storage_error)?;
      return Ok(CommitOutcome::WindowTaken);
    }

    if !try_insert_booking(&mut tx, &booking).await? {
      warn!("Exclusion constraint rejected the booking; session kept.");
      return Ok(CommitOutcome::WindowTaken);
    }

    tx.commit().await.map_err(storage_error)?;
    Ok(CommitOutcome::Committed(booking))
  }

  async fn settled_records(&self, gateway_order_ref: &str) -> SettlementResult<SettledRecords> {
    let mut conn = self.pool.acquire().await.map_err(storage_error)?;
    let order_rows = orders::rows_for_ref(&mut conn, gateway_order_ref, false).await?;
    Ok(SettledRecords {
      orders: orders::with_items(&mut conn, order_rows).await?,
      bookings: bookings::for_ref(&mut conn, gateway_order_ref, false).await?,
    })
  }

  #[instrument(skip(self), err(Display))]
  async fn mark_captured(
    &self,
    gateway_order_ref: &str,
    gateway_payment_ref: Option<&str>,
  ) -> SettlementResult<SettledRecords> {
    let mut tx = self.pool.begin().await.map_err(storage_error)?;

    let order_rows: Vec<OrderRow> = orders::rows_for_ref(&mut tx, gateway_order_ref, true).await?;
    let mut updated_orders = orders::with_items(&mut tx, order_rows).await?;
    for order in &mut updated_orders {
      order.status = order.status.on_capture();
      order.payment_status = order.payment_status.on_capture();
      if let Some(payment_ref) = gateway_payment_ref {
        order.gateway_payment_ref.get_or_insert_with(|| payment_ref.to_string());
      }
      sqlx::query("UPDATE orders SET status = $2, payment_status = $3, gateway_payment_ref = $4 WHERE id = $1")
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.gateway_payment_ref.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;
    }

    let mut updated_bookings = bookings::for_ref(&mut tx, gateway_order_ref, true).await?;
    for booking in &mut updated_bookings {
      booking.payment_status = booking.payment_status.on_capture();
      if let Some(payment_ref) = gateway_payment_ref {
        booking.gateway_payment_ref.get_or_insert_with(|| payment_ref.to_string());
      }
      sqlx::query("UPDATE bookings SET payment_status = $2, gateway_payment_ref = $3 WHERE id = $1")
        .bind(booking.id)
        .bind(booking.payment_status.as_str())
        .bind(booking.gateway_payment_ref.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;
    }

    tx.commit().await.map_err(storage_error)?;
    Ok(SettledRecords {
      orders: updated_orders,
      bookings: updated_bookings,
    })
  }

  async fn purge_sessions_created_before(&self, cutoff: DateTime<Utc>) -> SettlementResult<u64> {
    let result = sqlx::query("DELETE FROM payment_sessions WHERE created_at < $1")
      .bind(cutoff)
      .execute(&self.pool)
      .await
      .map_err(storage_error)?;
    Ok(result.rows_affected())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;
  use krishi::model::{BillingBasis, BookingQuote, Snapshot};

  fn quote(resource: ResourceRef, start: DateTime<Utc>, hours: i64) -> BookingQuote {
    BookingQuote {
      resource,
      owner_id: Uuid::new_v4(),
      window: TimeWindow::new(start, start + Duration::hours(hours)).unwrap(),
      quantity_tons: None,
      billing: BillingBasis::Hourly { seconds: hours * 3_600 },
      rate_paise: 20_000,
      total_paise: 20_000 * hours,
    }
  }

  async fn seed_session(store: &PgSettlementStore, buyer_id: Uuid, reference: &str, quote: &BookingQuote) {
    let session = PendingPaymentSession::new(
      buyer_id,
      reference.to_string(),
      "INR".to_string(),
      Snapshot::EquipmentBooking(quote.clone()),
      Utc::now(),
    );
    store.insert_session(&session).await.unwrap();
  }

  fn settled(buyer_id: Uuid, quote: &BookingQuote, reference: &str) -> BookingRecord {
    BookingRecord::settled_from_quote(buyer_id, quote, reference, "pay_1", Utc::now())
  }

  async fn seed_holding_booking(pool: &PgPool, quote: &BookingQuote) {
    let mut conn = pool.acquire().await.unwrap();
    insert_booking(&mut conn, &settled(Uuid::new_v4(), quote, "order_existing")).await.unwrap();
  }

  #[sqlx::test(migrations = "./migrations")]
  async fn overlapping_commit_is_window_taken_and_keeps_session(pool: PgPool) {
    let store = PgSettlementStore::new(pool.clone());
    let tractor = ResourceRef::equipment(Uuid::new_v4());
    let start = Utc::now() + Duration::days(2);
    seed_holding_booking(&pool, &quote(tractor, start, 4)).await;

    let buyer = Uuid::new_v4();
    let late = quote(tractor, start + Duration::hours(2), 4);
    seed_session(&store, buyer, "order_late", &late).await;

    let outcome = store
      .commit_booking(buyer, "order_late", settled(buyer, &late, "order_late"))
      .await
      .unwrap();

    assert!(matches!(outcome, CommitOutcome::WindowTaken));
    assert!(store.find_session("order_late", Some(buyer)).await.unwrap().is_some());
    assert!(store.settled_records("order_late").await.unwrap().bookings.is_empty());
  }

  #[sqlx::test(migrations = "./migrations")]
  async fn exclusion_violation_maps_to_window_taken_and_rolls_back(pool: PgPool) {
    let store = PgSettlementStore::new(pool.clone());
    let tractor = ResourceRef::equipment(Uuid::new_v4());
    let start = Utc::now() + Duration::days(2);
    seed_holding_booking(&pool, &quote(tractor, start, 4)).await;

    let buyer = Uuid::new_v4();
    let late = quote(tractor, start + Duration::hours(1), 2);
    seed_session(&store, buyer, "order_late", &late).await;

    // Same statements commit_booking runs once the pre-check has passed.
    let mut tx = pool.begin().await.unwrap();
    assert!(consume_session(&mut tx, buyer, "order_late").await.unwrap());
    let inserted = try_insert_booking(&mut tx, &settled(buyer, &late, "order_late")).await.unwrap();
    assert!(!inserted);
    drop(tx);

    assert!(store.find_session("order_late", Some(buyer)).await.unwrap().is_some());
    assert!(store.settled_records("order_late").await.unwrap().bookings.is_empty());
  }

  #[sqlx::test(migrations = "./migrations")]
  async fn back_to_back_windows_settle(pool: PgPool) {
    let store = PgSettlementStore::new(pool.clone());
    let tractor = ResourceRef::equipment(Uuid::new_v4());
    let start = Utc::now() + Duration::days(2);
    seed_holding_booking(&pool, &quote(tractor, start, 4)).await;

    let buyer = Uuid::new_v4();
    let next = quote(tractor, start + Duration::hours(4), 3);
    seed_session(&store, buyer, "order_next", &next).await;

    let outcome = store
      .commit_booking(buyer, "order_next", settled(buyer, &next, "order_next"))
      .await
      .unwrap();

    assert!(matches!(outcome, CommitOutcome::Committed(_)));
    assert!(store.find_session("order_next", Some(buyer)).await.unwrap().is_none());
    assert_eq!(store.settled_records("order_next").await.unwrap().bookings.len(), 1);
  }
}
