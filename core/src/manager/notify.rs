// core/src/manager/notify.rs
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::contexts::{GatewayEvent, GatewayEventKind, NotificationOutcome, NotifyCtxData};
use crate::error::{SettlementError, SettlementResult};
use crate::pipeline::{ContextData, Pipeline, PipelineControl, SkipCondition};

#[derive(Debug, Deserialize)]
struct RawEvent {
  event: String,
  #[serde(default)]
  payload: RawPayload,
}

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
  payment: Option<RawEntity<RawPayment>>,
  order: Option<RawEntity<RawOrder>>,
}

#[derive(Debug, Deserialize)]
struct RawEntity<T> {
  entity: T,
}

#[derive(Debug, Deserialize)]
struct RawPayment {
  id: String,
  order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOrder {
  id: String,
}

/// Extracts the event kind and references from a gateway notification body.
pub fn parse_event(raw_body: &[u8]) -> SettlementResult<GatewayEvent> {
  let raw: RawEvent = serde_json::from_slice(raw_body)
    .map_err(|e| SettlementError::Validation(format!("Malformed notification payload: {}", e)))?;

  let kind = match raw.event.as_str() {
    "payment.captured" | "order.paid" => GatewayEventKind::Captured,
    "payment.failed" => GatewayEventKind::Failed,
    _ => GatewayEventKind::Other(raw.event.clone()),
  };
  let payment = raw.payload.payment.map(|p| p.entity);
  let gateway_order_ref = payment
    .as_ref()
    .and_then(|p| p.order_id.clone())
    .or_else(|| raw.payload.order.map(|o| o.entity.id));

  Ok(GatewayEvent {
    kind,
    gateway_order_ref,
    gateway_payment_ref: payment.map(|p| p.id),
  })
}

fn unless_event(kind: GatewayEventKind) -> Option<SkipCondition<NotifyCtxData>> {
  Some(Arc::new(move |ctx: ContextData<NotifyCtxData>| {
    ctx.read().event.as_ref().map(|e| &e.kind) != Some(&kind)
  }))
}

pub(crate) fn build_notify_pipeline() -> Pipeline<NotifyCtxData, SettlementError> {
  let mut p = Pipeline::new(
    "handle_notification",
    &[
      ("verify_signature", false, None),
      ("parse_event", false, None),
      ("apply_capture", false, unless_event(GatewayEventKind::Captured)),
      ("apply_failure", false, unless_event(GatewayEventKind::Failed)),
    ],
  );

  p.on_root("verify_signature", |ctx| Box::pin(verify_signature(ctx)));
  p.on_root("parse_event", |ctx| Box::pin(parse_step(ctx)));
  p.on_root("apply_capture", |ctx| Box::pin(apply_capture(ctx)));
  p.on_root("apply_failure", |ctx| Box::pin(apply_failure(ctx)));
  p
}

async fn verify_signature(ctx: ContextData<NotifyCtxData>) -> SettlementResult<PipelineControl> {
  let verified = {
    let guard = ctx.read();
    guard.deps.gateway.verify_webhook_signature(&guard.raw_body, &guard.signature)?
  };
  if !verified {
    warn!("Notification signature mismatch.");
    return Err(SettlementError::Auth("Invalid notification signature".to_string()));
  }
  Ok(PipelineControl::Continue)
}

async fn parse_step(ctx: ContextData<NotifyCtxData>) -> SettlementResult<PipelineControl> {
  let event = parse_event(&ctx.read().raw_body)?;
  info!(event = ?event.kind, gateway_order_ref = ?event.gateway_order_ref, "Gateway notification received.");

  let mut guard = ctx.write();
  let control = match (&event.kind, &event.gateway_order_ref) {
    (GatewayEventKind::Other(name), _) => {
      guard.outcome = Some(NotificationOutcome::Ignored { event: name.clone() });
      PipelineControl::Stop
    }
    (_, None) => {
      guard.outcome = Some(NotificationOutcome::NothingToDo);
      PipelineControl::Stop
    }
    _ => PipelineControl::Continue,
  };
  guard.event = Some(event);
  Ok(control)
}

fn event_refs(ctx: &ContextData<NotifyCtxData>) -> SettlementResult<(String, Option<String>)> {
  let guard = ctx.read();
  guard
    .event
    .as_ref()
    .and_then(|e| e.gateway_order_ref.clone().map(|r| (r, e.gateway_payment_ref.clone())))
    .ok_or_else(|| SettlementError::Validation("Notification carries no order reference".to_string()))
}

/// Capture never creates records: it only confirms ones the client callback
/// already settled. A lone pending session is left for that callback.
async fn apply_capture(ctx: ContextData<NotifyCtxData>) -> SettlementResult<PipelineControl> {
  let store = ctx.read().deps.store.clone();
  let (gateway_order_ref, gateway_payment_ref) = event_refs(&ctx)?;

  let outcome = if !store.settled_records(&gateway_order_ref).await?.is_empty() {
    let updated = store
      .mark_captured(&gateway_order_ref, gateway_payment_ref.as_deref())
      .await?;
    info!(%gateway_order_ref, orders = updated.orders.len(), bookings = updated.bookings.len(), "Settled records marked captured.");
    NotificationOutcome::Captured {
      orders: updated.orders.len(),
      bookings: updated.bookings.len(),
    }
  } else if store.find_session(&gateway_order_ref, None).await?.is_some() {
    info!(%gateway_order_ref, "Capture notified before client verification; leaving session for the client callback.");
    NotificationOutcome::AwaitingClientVerification
  } else {
    NotificationOutcome::NothingToDo
  };

  ctx.write().outcome = Some(outcome);
  Ok(PipelineControl::Continue)
}

async fn apply_failure(ctx: ContextData<NotifyCtxData>) -> SettlementResult<PipelineControl> {
  let store = ctx.read().deps.store.clone();
  let (gateway_order_ref, _) = event_refs(&ctx)?;

  let outcome = if store.discard_session(&gateway_order_ref).await? {
    info!(%gateway_order_ref, "Payment failed; pending session discarded.");
    NotificationOutcome::SessionDiscarded
  } else {
    NotificationOutcome::NothingToDo
  };
  ctx.write().outcome = Some(outcome);
  Ok(PipelineControl::Continue)
}
