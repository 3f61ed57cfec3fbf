// marketplace_app/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

/// Gateway-to-server notifications. The raw body is what gets signed, so it
/// is taken as bytes and only parsed after the signature checks out.
#[instrument(name = "handler::payment_webhook", skip(app_state, req, body), fields(body_len = body.len()))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| AppError::Auth(format!("Missing {} header", SIGNATURE_HEADER)))?;

  let outcome = app_state.manager.handle_notification(&body, signature).await?;

  info!(outcome = ?outcome, "Webhook processed.");
  Ok(HttpResponse::Ok().json(outcome))
}
