// core/src/manager/contexts.rs

//! Root data types of the settlement pipelines.
//! Handlers receive these wrapped in [`ContextData`](crate::pipeline::ContextData).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SettlementConfig;
use crate::gateway::{PaymentGateway, RemoteOrder};
use crate::model::{CheckoutRequest, PendingPaymentSession, SettledRecords, Snapshot};
use crate::store::SettlementStore;

/// Collaborators every pipeline needs. Cheap to clone.
#[derive(Clone)]
pub struct SettlementDeps {
  pub store: Arc<dyn SettlementStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub config: Arc<SettlementConfig>,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub deps: SettlementDeps,
  pub buyer_id: Uuid,
  pub request: CheckoutRequest,
  pub snapshot: Option<Snapshot>,
  pub remote_order: Option<RemoteOrder>,
  pub session: Option<PendingPaymentSession>,
}

#[derive(Clone)]
pub struct SettleCtxData {
  pub deps: SettlementDeps,
  pub buyer_id: Uuid,
  pub payment: PaymentConfirmation,
  pub session: Option<PendingPaymentSession>,
  pub settled: SettledRecords,
}

#[derive(Clone)]
pub struct NotifyCtxData {
  pub deps: SettlementDeps,
  pub raw_body: Vec<u8>,
  pub signature: String,
  pub event: Option<GatewayEvent>,
  pub outcome: Option<NotificationOutcome>,
}

/// What the client reports back after the gateway widget closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
  pub gateway_order_ref: String,
  pub gateway_payment_ref: String,
  pub signature: String,
}

/// Returned by checkout: everything the client needs to open the gateway widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
  pub gateway_order_ref: String,
  pub amount_paise: i64,
  pub currency: String,
  pub key_id: Option<String>,
  pub payment_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
  Captured,
  Failed,
  Other(String),
}

/// The parts of a notification this service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
  pub kind: GatewayEventKind,
  pub gateway_order_ref: Option<String>,
  pub gateway_payment_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotificationOutcome {
  /// Existing records were marked captured.
  Captured { orders: usize, bookings: usize },
  /// Only a pending session exists; the client callback will settle it.
  AwaitingClientVerification,
  /// A failed payment's pending session was removed.
  SessionDiscarded,
  /// Nothing is known about the reference.
  NothingToDo,
  /// Event type this service does not handle.
  Ignored { event: String },
}
