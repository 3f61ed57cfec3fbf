// marketplace_app/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::db::orders::{self, OrderAction};
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::my_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = orders::list_for_buyer(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::selling_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn selling_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = orders::list_for_seller(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::order_action", skip(app_state, path, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn order_action_handler(
  app_state: web::Data<AppState>,
  path: web::Path<(Uuid, OrderAction)>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let (order_id, action) = path.into_inner();
  let order = orders::apply_action(&app_state.db_pool, auth_user.user_id, order_id, action).await?;
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}
