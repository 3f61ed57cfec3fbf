// marketplace_app/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::cart;
use crate::errors::AppError;
use crate::models::CartView;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct UpdateCartItemPayload {
  pub quantity: i32,
}

#[instrument(name = "handler::view_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let lines = cart::list(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(CartView::from_lines(lines)))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let item = cart::add(
    &app_state.db_pool,
    auth_user.user_id,
    req_payload.product_id,
    req_payload.quantity,
  )
  .await?;

  info!(line_id = %item.id, "Item added to cart.");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Item added to cart successfully.",
      "cart_item": item
  })))
}

#[instrument(name = "handler::update_cart_item", skip(app_state, path, req_payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateCartItemPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let item = cart::update_quantity(
    &app_state.db_pool,
    auth_user.user_id,
    path.into_inner(),
    req_payload.quantity,
  )
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "cart_item": item })))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, path, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  cart::remove(&app_state.db_pool, auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::clear_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let removed = cart::clear(&app_state.db_pool, auth_user.user_id).await?;
  info!(removed, "Cart cleared.");
  Ok(HttpResponse::Ok().json(json!({ "removed": removed })))
}
