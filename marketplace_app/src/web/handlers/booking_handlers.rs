// marketplace_app/src/web/handlers/booking_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::db::bookings;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::my_bookings", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn my_bookings_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let bookings = bookings::list_for_buyer(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "bookings": bookings })))
}

#[instrument(name = "handler::confirm_booking", skip(app_state, path, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn confirm_booking_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let booking = bookings::confirm(&app_state.db_pool, auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "booking": booking })))
}

#[instrument(name = "handler::cancel_booking", skip(app_state, path, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn cancel_booking_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cutoff = app_state.config.settlement.cancellation_cutoff;
  let booking = bookings::cancel(&app_state.db_pool, auth_user.user_id, path.into_inner(), cutoff).await?;
  Ok(HttpResponse::Ok().json(json!({ "booking": booking })))
}
