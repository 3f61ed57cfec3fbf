// core/src/manager/mod.rs

//! The payment session manager.
//!
//! Owns the rule that durable orders and bookings are written at most once per
//! gateway order reference, and only after the payment signature checks out.
//! Each public operation runs one of three step pipelines:
//!
//! - `begin_checkout`: quote, check availability, create the remote order,
//!   persist the pending session.
//! - `verify_and_settle`: verify the client signature, load the session and
//!   materialize records in one atomic commit.
//! - `handle_notification`: verify the webhook signature and reconcile
//!   capture/failure events with what already exists.

pub mod checkout;
pub mod contexts;
pub mod notify;
pub mod settle;

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::SettlementConfig;
use crate::error::{PipelineError, SettlementError, SettlementResult};
use crate::gateway::PaymentGateway;
use crate::model::{CheckoutRequest, SettledRecords};
use crate::pipeline::{ContextData, Pipeline, PipelineResult};
use crate::store::SettlementStore;

pub use contexts::{
  CheckoutCtxData, CheckoutReceipt, GatewayEvent, GatewayEventKind, NotificationOutcome, NotifyCtxData,
  PaymentConfirmation, SettleCtxData, SettlementDeps,
};

pub struct PaymentSessionManager {
  deps: SettlementDeps,
  checkout: Pipeline<CheckoutCtxData, SettlementError>,
  settle: Pipeline<SettleCtxData, SettlementError>,
  notify: Pipeline<NotifyCtxData, SettlementError>,
}

fn expect_completed(pipeline: &str, result: PipelineResult) -> SettlementResult<()> {
  match result {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => Err(
      PipelineError::Internal(format!("Pipeline '{}' stopped before producing a result", pipeline)).into(),
    ),
  }
}

impl PaymentSessionManager {
  pub fn new(store: Arc<dyn SettlementStore>, gateway: Arc<dyn PaymentGateway>, config: SettlementConfig) -> Self {
    Self {
      deps: SettlementDeps {
        store,
        gateway,
        config: Arc::new(config),
      },
      checkout: checkout::build_checkout_pipeline(),
      settle: settle::build_settle_pipeline(),
      notify: notify::build_notify_pipeline(),
    }
  }

  pub fn config(&self) -> &SettlementConfig {
    &self.deps.config
  }

  pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
    &self.deps.gateway
  }

  /// Quotes the request, registers a remote order and persists a pending
  /// session keyed by its reference. Nothing durable is created.
  #[instrument(name = "begin_checkout", skip(self, request), fields(kind = request.kind().as_str()), err(Display))]
  pub async fn begin_checkout(&self, buyer_id: Uuid, request: CheckoutRequest) -> SettlementResult<CheckoutReceipt> {
    let ctx = ContextData::new(CheckoutCtxData {
      deps: self.deps.clone(),
      buyer_id,
      request,
      snapshot: None,
      remote_order: None,
      session: None,
    });
    let result = self.checkout.run(ctx.clone()).await?;
    expect_completed(self.checkout.name(), result)?;

    let session = ctx
      .read()
      .session
      .clone()
      .ok_or_else(|| PipelineError::Internal("Checkout completed without a session".to_string()))?;
    Ok(CheckoutReceipt {
      gateway_order_ref: session.gateway_order_ref,
      amount_paise: session.amount_paise,
      currency: session.currency,
      key_id: self.deps.gateway.public_key_id(),
      payment_enabled: self.deps.gateway.is_enabled(),
    })
  }

  /// Settles a client-confirmed payment.
  ///
  /// A second call for the same reference fails with `NotFound`; a booking
  /// whose window was taken after payment fails with `Consistency` and leaves
  /// the session in place.
  #[instrument(
    name = "verify_and_settle",
    skip(self, payment),
    fields(gateway_order_ref = %payment.gateway_order_ref),
    err(Display)
  )]
  pub async fn verify_and_settle(
    &self,
    buyer_id: Uuid,
    payment: PaymentConfirmation,
  ) -> SettlementResult<SettledRecords> {
    let ctx = ContextData::new(SettleCtxData {
      deps: self.deps.clone(),
      buyer_id,
      payment,
      session: None,
      settled: SettledRecords::default(),
    });
    let result = self.settle.run(ctx.clone()).await?;
    expect_completed(self.settle.name(), result)?;

    let settled = ctx.read().settled.clone();
    if settled.is_empty() {
      return Err(PipelineError::Internal("Settlement completed without records".to_string()).into());
    }
    Ok(settled)
  }

  /// Reconciles an asynchronous gateway notification. `raw_body` must be the
  /// exact bytes received; the signature covers them, not a re-serialization.
  #[instrument(name = "handle_notification", skip(self, raw_body, signature), fields(body_len = raw_body.len()), err(Display))]
  pub async fn handle_notification(&self, raw_body: &[u8], signature: &str) -> SettlementResult<NotificationOutcome> {
    let ctx = ContextData::new(NotifyCtxData {
      deps: self.deps.clone(),
      raw_body: raw_body.to_vec(),
      signature: signature.to_string(),
      event: None,
      outcome: None,
    });
    self.notify.run(ctx.clone()).await?;

    let outcome = ctx.read().outcome.clone().unwrap_or(NotificationOutcome::NothingToDo);
    Ok(outcome)
  }

  /// Deletes pending sessions older than the configured retention.
  #[instrument(name = "purge_abandoned_sessions", skip(self), err(Display))]
  pub async fn purge_abandoned_sessions(&self) -> SettlementResult<u64> {
    let cutoff = Utc::now() - self.deps.config.session_retention;
    let purged = self.deps.store.purge_sessions_created_before(cutoff).await?;
    if purged > 0 {
      info!(purged, %cutoff, "Abandoned payment sessions purged.");
    }
    Ok(purged)
  }
}
