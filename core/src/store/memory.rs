// core/src/store/memory.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::{CommitOutcome, SettlementStore};
use crate::error::{SettlementError, SettlementResult};
use crate::model::{
  BookingRecord, CartLine, ColdStorageListing, EquipmentListing, OrderRecord, PendingPaymentSession, PricedCartLine,
  Product, ResourceRef, SettledRecords, TimeWindow,
};

#[derive(Debug, Default)]
struct Tables {
  products: HashMap<Uuid, Product>,
  cart: Vec<CartLine>,
  equipment: HashMap<Uuid, EquipmentListing>,
  cold_storage: HashMap<Uuid, ColdStorageListing>,
  sessions: HashMap<String, PendingPaymentSession>,
  orders: Vec<OrderRecord>,
  bookings: Vec<BookingRecord>,
  fail_commits: bool,
}

impl Tables {
  fn window_is_taken(&self, resource: &ResourceRef, window: &TimeWindow) -> bool {
    self.bookings.iter().any(|b| b.holds(resource, window))
  }

  fn take_session(&mut self, buyer_id: Uuid, gateway_order_ref: &str) -> Option<PendingPaymentSession> {
    let owned = self
      .sessions
      .get(gateway_order_ref)
      .is_some_and(|s| s.buyer_id == buyer_id);
    if owned {
      self.sessions.remove(gateway_order_ref)
    } else {
      None
    }
  }

  fn check_writable(&self) -> SettlementResult<()> {
    if self.fail_commits {
      return Err(SettlementError::storage(anyhow::anyhow!("simulated storage failure")));
    }
    Ok(())
  }
}

/// Settlement store kept in process memory.
///
/// All tables sit behind one mutex, so every trait call is trivially atomic.
/// Used by the test suites and for running the core without a database.
#[derive(Debug, Default)]
pub struct InMemorySettlementStore {
  tables: Mutex<Tables>,
}

impl InMemorySettlementStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_product(&self, product: Product) {
    self.tables.lock().products.insert(product.id, product);
  }

  pub fn add_to_cart(&self, buyer_id: Uuid, product_id: Uuid, quantity: i32) -> Uuid {
    let line = CartLine {
      id: Uuid::new_v4(),
      buyer_id,
      product_id,
      quantity,
      added_at: Utc::now(),
    };
    let id = line.id;
    self.tables.lock().cart.push(line);
    id
  }

  pub fn insert_equipment(&self, listing: EquipmentListing) {
    self.tables.lock().equipment.insert(listing.id, listing);
  }

  pub fn insert_cold_storage(&self, listing: ColdStorageListing) {
    self.tables.lock().cold_storage.insert(listing.id, listing);
  }

  pub fn insert_booking(&self, booking: BookingRecord) {
    self.tables.lock().bookings.push(booking);
  }

  /// Makes every subsequent commit fail with a storage error.
  pub fn set_fail_commits(&self, fail: bool) {
    self.tables.lock().fail_commits = fail;
  }

  pub fn cart_len(&self, buyer_id: Uuid) -> usize {
    self.tables.lock().cart.iter().filter(|l| l.buyer_id == buyer_id).count()
  }

  pub fn session_count(&self) -> usize {
    self.tables.lock().sessions.len()
  }

  pub fn orders(&self) -> Vec<OrderRecord> {
    self.tables.lock().orders.clone()
  }

  pub fn bookings(&self) -> Vec<BookingRecord> {
    self.tables.lock().bookings.clone()
  }
}

#[async_trait]
impl SettlementStore for InMemorySettlementStore {
  async fn priced_cart(&self, buyer_id: Uuid) -> SettlementResult<Vec<PricedCartLine>> {
    let tables = self.tables.lock();
    tables
      .cart
      .iter()
      .filter(|line| line.buyer_id == buyer_id)
      .map(|line| {
        let product = tables.products.get(&line.product_id).cloned().ok_or_else(|| {
          SettlementError::NotFound(format!("Product {} in cart no longer exists", line.product_id))
        })?;
        Ok(PricedCartLine {
          line_id: line.id,
          quantity: line.quantity,
          product,
        })
      })
      .collect()
  }

  async fn equipment(&self, equipment_id: Uuid) -> SettlementResult<Option<EquipmentListing>> {
    Ok(self.tables.lock().equipment.get(&equipment_id).cloned())
  }

  async fn cold_storage(&self, facility_id: Uuid) -> SettlementResult<Option<ColdStorageListing>> {
    Ok(self.tables.lock().cold_storage.get(&facility_id).cloned())
  }

  async fn window_is_taken(&self, resource: ResourceRef, window: TimeWindow) -> SettlementResult<bool> {
    Ok(self.tables.lock().window_is_taken(&resource, &window))
  }

  async fn insert_session(&self, session: &PendingPaymentSession) -> SettlementResult<()> {
    let mut tables = self.tables.lock();
    if tables.sessions.contains_key(&session.gateway_order_ref) {
      return Err(SettlementError::Conflict(format!(
        "Payment session for {} already exists",
        session.gateway_order_ref
      )));
    }
    tables.sessions.insert(session.gateway_order_ref.clone(), session.clone());
    Ok(())
  }

  async fn find_session(
    &self,
    gateway_order_ref: &str,
    buyer_id: Option<Uuid>,
  ) -> SettlementResult<Option<PendingPaymentSession>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .sessions
        .get(gateway_order_ref)
        .filter(|s| buyer_id.map_or(true, |buyer| s.buyer_id == buyer))
        .cloned(),
    )
  }

  async fn discard_session(&self, gateway_order_ref: &str) -> SettlementResult<bool> {
    Ok(self.tables.lock().sessions.remove(gateway_order_ref).is_some())
  }

  async fn commit_marketplace(
    &self,
    buyer_id: Uuid,
    gateway_order_ref: &str,
    orders: Vec<OrderRecord>,
  ) -> SettlementResult<CommitOutcome<Vec<OrderRecord>>> {
    let mut tables = self.tables.lock();
    tables.check_writable()?;
    if tables.take_session(buyer_id, gateway_order_ref).is_none() {
      return Ok(CommitOutcome::SessionMissing);
    }
    tables.orders.extend(orders.iter().cloned());
    tables.cart.retain(|line| line.buyer_id != buyer_id);
    Ok(CommitOutcome::Committed(orders))
  }

  async fn commit_booking(
    &self,
    buyer_id: Uuid,
    gateway_order_ref: &str,
    booking: BookingRecord,
  ) -> SettlementResult<CommitOutcome<BookingRecord>> {
    let mut tables = self.tables.lock();
    tables.check_writable()?;
    let Some(session) = tables.take_session(buyer_id, gateway_order_ref) else {
      return Ok(CommitOutcome::SessionMissing);
    };
    if tables.window_is_taken(&booking.resource, &booking.window) {
      // Put it back: the session stays for manual remediation.
      tables.sessions.insert(session.gateway_order_ref.clone(), session);
      return Ok(CommitOutcome::WindowTaken);
    }
    tables.bookings.push(booking.clone());
    Ok(CommitOutcome::Committed(booking))
  }

  async fn settled_records(&self, gateway_order_ref: &str) -> SettlementResult<SettledRecords> {
    let tables = self.tables.lock();
    Ok(SettledRecords {
      orders: tables
        .orders
        .iter()
        .filter(|o| o.gateway_order_ref == gateway_order_ref)
        .cloned()
        .collect(),
      bookings: tables
        .bookings
        .iter()
        .filter(|b| b.gateway_order_ref == gateway_order_ref)
        .cloned()
        .collect(),
    })
  }

  async fn mark_captured(
    &self,
    gateway_order_ref: &str,
    gateway_payment_ref: Option<&str>,
  ) -> SettlementResult<SettledRecords> {
    let mut tables = self.tables.lock();
    tables.check_writable()?;
    let mut updated = SettledRecords::default();
    for order in tables.orders.iter_mut().filter(|o| o.gateway_order_ref == gateway_order_ref) {
      order.status = order.status.on_capture();
      order.payment_status = order.payment_status.on_capture();
      if let Some(payment_ref) = gateway_payment_ref {
        order.gateway_payment_ref.get_or_insert_with(|| payment_ref.to_string());
      }
      updated.orders.push(order.clone());
    }
    for booking in tables.bookings.iter_mut().filter(|b| b.gateway_order_ref == gateway_order_ref) {
      booking.payment_status = booking.payment_status.on_capture();
      if let Some(payment_ref) = gateway_payment_ref {
        booking.gateway_payment_ref.get_or_insert_with(|| payment_ref.to_string());
      }
      updated.bookings.push(booking.clone());
    }
    Ok(updated)
  }

  async fn purge_sessions_created_before(&self, cutoff: DateTime<Utc>) -> SettlementResult<u64> {
    let mut tables = self.tables.lock();
    let before = tables.sessions.len();
    tables.sessions.retain(|_, s| s.created_at >= cutoff);
    Ok((before - tables.sessions.len()) as u64)
  }
}
