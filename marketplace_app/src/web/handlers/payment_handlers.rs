// marketplace_app/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use krishi::model::CheckoutRequest;
use krishi::PaymentConfirmation;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

/// Starts a payment for the cart or a booking and hands the client what it
/// needs to open the gateway's checkout.
#[instrument(
    name = "handler::begin_checkout",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, kind = req_payload.kind().as_str())
)]
pub async fn begin_checkout_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CheckoutRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let receipt = app_state
    .manager
    .begin_checkout(auth_user.user_id, req_payload.into_inner())
    .await?;

  info!(gateway_order_ref = %receipt.gateway_order_ref, amount_paise = receipt.amount_paise, "Checkout started.");
  Ok(HttpResponse::Ok().json(receipt))
}

/// Client callback after the gateway reports success. Creates the orders or
/// booking exactly once per gateway reference.
#[instrument(
    name = "handler::verify_payment",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, gateway_order_ref = %req_payload.gateway_order_ref)
)]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PaymentConfirmation>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let settled = app_state
    .manager
    .verify_and_settle(auth_user.user_id, req_payload.into_inner())
    .await?;

  info!(
    orders = settled.orders.len(),
    bookings = settled.bookings.len(),
    "Payment verified and settled."
  );
  Ok(HttpResponse::Ok().json(json!({
      "message": "Payment verified.",
      "total_paise": settled.total_paise(),
      "orders": settled.orders,
      "bookings": settled.bookings,
  })))
}
