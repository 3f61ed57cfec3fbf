// core/src/manager/settle.rs
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::contexts::SettleCtxData;
use crate::error::{SettlementError, SettlementResult};
use crate::model::{BookingRecord, OrderRecord, Snapshot};
use crate::pipeline::{ContextData, Pipeline, PipelineControl, SkipCondition};
use crate::store::CommitOutcome;

fn unless_marketplace() -> Option<SkipCondition<SettleCtxData>> {
  Some(Arc::new(|ctx: ContextData<SettleCtxData>| {
    !matches!(
      ctx.read().session.as_ref().map(|s| &s.snapshot),
      Some(Snapshot::Marketplace(_))
    )
  }))
}

fn unless_booking() -> Option<SkipCondition<SettleCtxData>> {
  Some(Arc::new(|ctx: ContextData<SettleCtxData>| {
    ctx
      .read()
      .session
      .as_ref()
      .and_then(|s| s.snapshot.booking_quote())
      .is_none()
  }))
}

pub(crate) fn build_settle_pipeline() -> Pipeline<SettleCtxData, SettlementError> {
  let mut p = Pipeline::new(
    "verify_and_settle",
    &[
      ("verify_signature", false, None),
      ("load_session", false, None),
      ("settle_marketplace", false, unless_marketplace()),
      ("settle_booking", false, unless_booking()),
    ],
  );

  p.on_root("verify_signature", |ctx| Box::pin(verify_signature(ctx)));
  p.on_root("load_session", |ctx| Box::pin(load_session(ctx)));
  p.on_root("settle_marketplace", |ctx| Box::pin(settle_marketplace(ctx)));
  p.on_root("settle_booking", |ctx| Box::pin(settle_booking(ctx)));
  p
}

fn session_missing(gateway_order_ref: &str) -> SettlementError {
  SettlementError::NotFound(format!("No pending payment session for {}", gateway_order_ref))
}

async fn verify_signature(ctx: ContextData<SettleCtxData>) -> SettlementResult<PipelineControl> {
  let verified = {
    let guard = ctx.read();
    let payment = &guard.payment;
    if payment.gateway_order_ref.is_empty() || payment.gateway_payment_ref.is_empty() || payment.signature.is_empty() {
      return Err(SettlementError::Validation(
        "Order reference, payment reference and signature are required".to_string(),
      ));
    }
    guard.deps.gateway.verify_payment_signature(
      &payment.gateway_order_ref,
      &payment.gateway_payment_ref,
      &payment.signature,
    )?
  };

  if !verified {
    let guard = ctx.read();
    warn!(
      buyer_id = %guard.buyer_id,
      gateway_order_ref = %guard.payment.gateway_order_ref,
      "Payment signature mismatch."
    );
    return Err(SettlementError::Auth("Payment signature verification failed".to_string()));
  }
  Ok(PipelineControl::Continue)
}

async fn load_session(ctx: ContextData<SettleCtxData>) -> SettlementResult<PipelineControl> {
  let (store, buyer_id, gateway_order_ref) = {
    let guard = ctx.read();
    (guard.deps.store.clone(), guard.buyer_id, guard.payment.gateway_order_ref.clone())
  };

  let session = store
    .find_session(&gateway_order_ref, Some(buyer_id))
    .await?
    .ok_or_else(|| session_missing(&gateway_order_ref))?;
  ctx.write().session = Some(session);
  Ok(PipelineControl::Continue)
}

async fn settle_marketplace(ctx: ContextData<SettleCtxData>) -> SettlementResult<PipelineControl> {
  let (store, buyer_id, gateway_order_ref, orders) = {
    let guard = ctx.read();
    let Some(Snapshot::Marketplace(snapshot)) = guard.session.as_ref().map(|s| &s.snapshot) else {
      return Err(SettlementError::Validation("Expected a marketplace session".to_string()));
    };
    let now = Utc::now();
    let orders: Vec<OrderRecord> = snapshot
      .seller_groups
      .iter()
      .map(|group| {
        OrderRecord::settled_from_group(
          guard.buyer_id,
          group,
          &snapshot.delivery,
          &guard.payment.gateway_order_ref,
          &guard.payment.gateway_payment_ref,
          now,
        )
      })
      .collect();
    (
      guard.deps.store.clone(),
      guard.buyer_id,
      guard.payment.gateway_order_ref.clone(),
      orders,
    )
  };

  match store.commit_marketplace(buyer_id, &gateway_order_ref, orders).await? {
    CommitOutcome::Committed(orders) => {
      info!(%buyer_id, %gateway_order_ref, orders = orders.len(), "Marketplace payment settled.");
      ctx.write().settled.orders = orders;
      Ok(PipelineControl::Continue)
    }
    CommitOutcome::SessionMissing => Err(session_missing(&gateway_order_ref)),
    CommitOutcome::WindowTaken => Err(SettlementError::Consistency {
      gateway_order_ref,
      reason: "marketplace commit reported a booking conflict".to_string(),
    }),
  }
}

async fn settle_booking(ctx: ContextData<SettleCtxData>) -> SettlementResult<PipelineControl> {
  let (store, buyer_id, gateway_order_ref, booking) = {
    let guard = ctx.read();
    let quote = guard
      .session
      .as_ref()
      .and_then(|s| s.snapshot.booking_quote())
      .ok_or_else(|| SettlementError::Validation("Expected a booking session".to_string()))?;
    let booking = BookingRecord::settled_from_quote(
      guard.buyer_id,
      quote,
      &guard.payment.gateway_order_ref,
      &guard.payment.gateway_payment_ref,
      Utc::now(),
    );
    (
      guard.deps.store.clone(),
      guard.buyer_id,
      guard.payment.gateway_order_ref.clone(),
      booking,
    )
  };

  match store.commit_booking(buyer_id, &gateway_order_ref, booking).await? {
    CommitOutcome::Committed(booking) => {
      info!(%buyer_id, %gateway_order_ref, booking_id = %booking.id, resource = %booking.resource, "Booking payment settled.");
      ctx.write().settled.bookings = vec![booking];
      Ok(PipelineControl::Continue)
    }
    CommitOutcome::SessionMissing => Err(session_missing(&gateway_order_ref)),
    CommitOutcome::WindowTaken => {
      error!(
        %buyer_id,
        %gateway_order_ref,
        "Payment captured but the booking window was taken meanwhile. Manual refund required."
      );
      Err(SettlementError::Consistency {
        gateway_order_ref,
        reason: "the requested window was booked by someone else after payment".to_string(),
      })
    }
  }
}
