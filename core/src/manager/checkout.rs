// core/src/manager/checkout.rs
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::contexts::CheckoutCtxData;
use crate::error::{SettlementError, SettlementResult};
use crate::model::{CheckoutKind, CheckoutRequest, DeliveryDetails, PendingPaymentSession, Snapshot, TimeWindow};
use crate::pipeline::{ContextData, Pipeline, PipelineControl, SkipCondition};
use crate::pricing;

fn unless_kind(kind: CheckoutKind) -> Option<SkipCondition<CheckoutCtxData>> {
  Some(Arc::new(move |ctx: ContextData<CheckoutCtxData>| ctx.read().request.kind() != kind))
}

fn only_for_bookings() -> Option<SkipCondition<CheckoutCtxData>> {
  Some(Arc::new(|ctx: ContextData<CheckoutCtxData>| {
    ctx.read().request.kind() == CheckoutKind::Marketplace
  }))
}

pub(crate) fn build_checkout_pipeline() -> Pipeline<CheckoutCtxData, SettlementError> {
  let mut p = Pipeline::new(
    "begin_checkout",
    &[
      ("quote_marketplace", false, unless_kind(CheckoutKind::Marketplace)),
      ("quote_equipment", false, unless_kind(CheckoutKind::EquipmentBooking)),
      ("quote_cold_storage", false, unless_kind(CheckoutKind::ColdStorageBooking)),
      ("check_window_free", false, only_for_bookings()),
      ("create_remote_order", false, None),
      ("persist_session", false, None),
    ],
  );

  p.on_root("quote_marketplace", |ctx| Box::pin(quote_marketplace(ctx)));
  p.on_root("quote_equipment", |ctx| Box::pin(quote_equipment(ctx)));
  p.on_root("quote_cold_storage", |ctx| Box::pin(quote_cold_storage(ctx)));
  p.on_root("check_window_free", |ctx| Box::pin(check_window_free(ctx)));
  p.on_root("create_remote_order", |ctx| Box::pin(create_remote_order(ctx)));
  p.on_root("persist_session", |ctx| Box::pin(persist_session(ctx)));
  p
}

fn future_window(start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> SettlementResult<TimeWindow> {
  TimeWindow::new(start, end)?.not_in_past(Utc::now())
}

async fn quote_marketplace(ctx: ContextData<CheckoutCtxData>) -> SettlementResult<PipelineControl> {
  let (store, buyer_id, delivery_charge, delivery) = {
    let guard = ctx.read();
    let CheckoutRequest::Marketplace {
      delivery_address,
      delivery_phone,
    } = &guard.request
    else {
      return Err(SettlementError::Validation("Expected a marketplace checkout".to_string()));
    };
    (
      guard.deps.store.clone(),
      guard.buyer_id,
      guard.deps.config.delivery_charge_paise,
      DeliveryDetails {
        address: delivery_address.clone(),
        phone: delivery_phone.clone(),
      },
    )
  };

  let lines = store.priced_cart(buyer_id).await?;
  let snapshot = pricing::quote_marketplace(buyer_id, &lines, delivery_charge, delivery)?;
  info!(
    %buyer_id,
    sellers = snapshot.seller_groups.len(),
    amount_paise = snapshot.total_paise(),
    "Marketplace cart quoted."
  );

  ctx.write().snapshot = Some(Snapshot::Marketplace(snapshot));
  Ok(PipelineControl::Continue)
}

async fn quote_equipment(ctx: ContextData<CheckoutCtxData>) -> SettlementResult<PipelineControl> {
  let (store, buyer_id, threshold_hours, equipment_id, start, end) = {
    let guard = ctx.read();
    let CheckoutRequest::EquipmentBooking { equipment_id, start, end } = guard.request else {
      return Err(SettlementError::Validation("Expected an equipment booking".to_string()));
    };
    (
      guard.deps.store.clone(),
      guard.buyer_id,
      guard.deps.config.daily_rate_threshold_hours,
      equipment_id,
      start,
      end,
    )
  };

  let window = future_window(start, end)?;
  let listing = store
    .equipment(equipment_id)
    .await?
    .ok_or_else(|| SettlementError::NotFound(format!("Equipment {} not found", equipment_id)))?;
  let quote = pricing::quote_equipment(buyer_id, &listing, window, threshold_hours)?;
  info!(%buyer_id, %equipment_id, amount_paise = quote.total_paise, billing = ?quote.billing, "Equipment booking quoted.");

  ctx.write().snapshot = Some(Snapshot::EquipmentBooking(quote));
  Ok(PipelineControl::Continue)
}

async fn quote_cold_storage(ctx: ContextData<CheckoutCtxData>) -> SettlementResult<PipelineControl> {
  let (store, buyer_id, facility_id, quantity_tons, start, end) = {
    let guard = ctx.read();
    let CheckoutRequest::ColdStorageBooking {
      facility_id,
      quantity_tons,
      start,
      end,
    } = guard.request
    else {
      return Err(SettlementError::Validation("Expected a cold storage booking".to_string()));
    };
    (guard.deps.store.clone(), guard.buyer_id, facility_id, quantity_tons, start, end)
  };

  let window = future_window(start, end)?;
  let listing = store
    .cold_storage(facility_id)
    .await?
    .ok_or_else(|| SettlementError::NotFound(format!("Cold storage facility {} not found", facility_id)))?;
  let quote = pricing::quote_cold_storage(buyer_id, &listing, quantity_tons, window)?;
  info!(%buyer_id, %facility_id, quantity_tons, amount_paise = quote.total_paise, "Cold storage booking quoted.");

  ctx.write().snapshot = Some(Snapshot::ColdStorageBooking(quote));
  Ok(PipelineControl::Continue)
}

async fn check_window_free(ctx: ContextData<CheckoutCtxData>) -> SettlementResult<PipelineControl> {
  let (store, quote) = {
    let guard = ctx.read();
    let quote = guard
      .snapshot
      .as_ref()
      .and_then(Snapshot::booking_quote)
      .cloned()
      .ok_or_else(|| SettlementError::Validation("Booking quote missing".to_string()))?;
    (guard.deps.store.clone(), quote)
  };

  if store.window_is_taken(quote.resource, quote.window).await? {
    warn!(resource = %quote.resource, start = %quote.window.start, end = %quote.window.end, "Requested window overlaps an existing booking.");
    return Err(SettlementError::Conflict(
      "Resource is already booked for the requested time".to_string(),
    ));
  }
  Ok(PipelineControl::Continue)
}

async fn create_remote_order(ctx: ContextData<CheckoutCtxData>) -> SettlementResult<PipelineControl> {
  let (gateway, amount_paise, currency) = {
    let guard = ctx.read();
    let amount_paise = guard.snapshot.as_ref().map(Snapshot::total_paise).unwrap_or_default();
    (guard.deps.gateway.clone(), amount_paise, guard.deps.config.currency.clone())
  };
  if amount_paise <= 0 {
    return Err(SettlementError::Validation("Checkout amount must be positive".to_string()));
  }

  let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
  let remote_order = gateway.create_remote_order(amount_paise, &currency, &receipt).await?;
  ctx.write().remote_order = Some(remote_order);
  Ok(PipelineControl::Continue)
}

async fn persist_session(ctx: ContextData<CheckoutCtxData>) -> SettlementResult<PipelineControl> {
  let (store, session) = {
    let guard = ctx.read();
    let (Some(snapshot), Some(remote_order)) = (guard.snapshot.clone(), guard.remote_order.as_ref()) else {
      return Err(SettlementError::Validation("Checkout reached persistence without a quote".to_string()));
    };
    let session = PendingPaymentSession::new(
      guard.buyer_id,
      remote_order.id.clone(),
      guard.deps.config.currency.clone(),
      snapshot,
      Utc::now(),
    );
    (guard.deps.store.clone(), session)
  };

  store.insert_session(&session).await?;
  info!(
    buyer_id = %session.buyer_id,
    gateway_order_ref = %session.gateway_order_ref,
    amount_paise = session.amount_paise,
    "Pending payment session created."
  );
  ctx.write().session = Some(session);
  Ok(PipelineControl::Continue)
}
