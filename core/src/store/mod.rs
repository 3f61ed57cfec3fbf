// core/src/store/mod.rs

//! Persistence seam of the settlement core.
//!
//! Implementations must make each `commit_*` call a single atomic unit whose
//! first effect is the conditional removal of the pending session: whoever
//! removes it is the only caller that writes records for that reference.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SettlementResult;
use crate::model::{
  BookingRecord, ColdStorageListing, EquipmentListing, OrderRecord, PendingPaymentSession, PricedCartLine, ResourceRef,
  SettledRecords, TimeWindow,
};

pub use memory::InMemorySettlementStore;

/// Result of an atomic settlement write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome<T> {
  /// Session consumed and records written.
  Committed(T),
  /// No session for the reference and buyer; someone else already consumed it.
  SessionMissing,
  /// A holding booking now overlaps the window. Nothing was written and the
  /// session is still in place.
  WindowTaken,
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
  /// Buyer's cart joined with the current catalog rows.
  async fn priced_cart(&self, buyer_id: Uuid) -> SettlementResult<Vec<PricedCartLine>>;

  async fn equipment(&self, equipment_id: Uuid) -> SettlementResult<Option<EquipmentListing>>;

  async fn cold_storage(&self, facility_id: Uuid) -> SettlementResult<Option<ColdStorageListing>>;

  /// Whether any holding booking of `resource` overlaps `window`.
  async fn window_is_taken(&self, resource: ResourceRef, window: TimeWindow) -> SettlementResult<bool>;

  /// Fails with `Conflict` if the gateway reference is already in use.
  async fn insert_session(&self, session: &PendingPaymentSession) -> SettlementResult<()>;

  /// Looks a session up by reference, optionally scoped to its buyer.
  async fn find_session(
    &self,
    gateway_order_ref: &str,
    buyer_id: Option<Uuid>,
  ) -> SettlementResult<Option<PendingPaymentSession>>;

  /// Deletes the session for `gateway_order_ref`. Returns whether one existed.
  async fn discard_session(&self, gateway_order_ref: &str) -> SettlementResult<bool>;

  /// Consumes the session, writes the orders with their items and clears the buyer's cart.
  async fn commit_marketplace(
    &self,
    buyer_id: Uuid,
    gateway_order_ref: &str,
    orders: Vec<OrderRecord>,
  ) -> SettlementResult<CommitOutcome<Vec<OrderRecord>>>;

  /// Consumes the session and writes the booking, re-checking the window while
  /// the resource is locked.
  async fn commit_booking(
    &self,
    buyer_id: Uuid,
    gateway_order_ref: &str,
    booking: BookingRecord,
  ) -> SettlementResult<CommitOutcome<BookingRecord>>;

  async fn settled_records(&self, gateway_order_ref: &str) -> SettlementResult<SettledRecords>;

  /// Marks every record of the reference as captured without regressing later statuses.
  async fn mark_captured(
    &self,
    gateway_order_ref: &str,
    gateway_payment_ref: Option<&str>,
  ) -> SettlementResult<SettledRecords>;

  /// Deletes sessions created before `cutoff` and returns how many went away.
  async fn purge_sessions_created_before(&self, cutoff: DateTime<Utc>) -> SettlementResult<u64>;
}
