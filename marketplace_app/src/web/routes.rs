// marketplace_app/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{booking_handlers, cart_handlers, order_handlers, payment_handlers, webhook_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view_cart_handler))
          .route("/add", web::post().to(cart_handlers::add_to_cart_handler))
          // Before `/{item_id}` so "clear" is never read as an id.
          .route("/clear", web::delete().to(cart_handlers::clear_cart_handler))
          .route("/{item_id}", web::put().to(cart_handlers::update_cart_item_handler))
          .route("/{item_id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
      )
      .service(
        web::scope("/payments")
          .route("/checkout", web::post().to(payment_handlers::begin_checkout_handler))
          .route("/verify", web::post().to(payment_handlers::verify_payment_handler))
          .route("/webhook", web::post().to(webhook_handlers::payment_webhook_handler)),
      )
      .service(
        web::scope("/orders")
          .route("/mine", web::get().to(order_handlers::my_orders_handler))
          .route("/selling", web::get().to(order_handlers::selling_orders_handler))
          .route("/{order_id}/{action}", web::post().to(order_handlers::order_action_handler)),
      )
      .service(
        web::scope("/bookings")
          .route("/mine", web::get().to(booking_handlers::my_bookings_handler))
          .route("/{booking_id}/confirm", web::post().to(booking_handlers::confirm_booking_handler))
          .route("/{booking_id}/cancel", web::post().to(booking_handlers::cancel_booking_handler)),
      ),
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::state::AppState;
  use crate::web::extractors::USER_ID_HEADER;
  use crate::web::handlers::webhook_handlers::SIGNATURE_HEADER;
  use actix_web::http::StatusCode;
  use actix_web::{test, App};
  use krishi::{gateway_from_config, GatewayConfig, InMemorySettlementStore, PaymentSessionManager, SettlementConfig};
  use sqlx::postgres::PgPoolOptions;
  use std::sync::Arc;
  use uuid::Uuid;

  // Payments run against the in-memory store and the disabled gateway; the
  // pool is never connected because these routes don't touch it.
  fn test_state() -> AppState {
    let config = AppConfig {
      server_host: "127.0.0.1".into(),
      server_port: 0,
      database_url: "postgres://unused@localhost/unused".into(),
      db_max_connections: 1,
      purge_interval_secs: 3600,
      settlement: SettlementConfig::default(),
      gateway: GatewayConfig::default(),
    };
    let gateway = gateway_from_config(&config.gateway).unwrap();
    let manager = PaymentSessionManager::new(
      Arc::new(InMemorySettlementStore::new()),
      gateway,
      config.settlement.clone(),
    );
    AppState {
      db_pool: PgPoolOptions::new().connect_lazy(&config.database_url).unwrap(),
      manager: Arc::new(manager),
      config: Arc::new(config),
    }
  }

  #[actix_rt::test]
  async fn health_is_public() {
    let app = test::init_service(
      App::new()
        .app_data(web::Data::new(test_state()))
        .configure(configure_app_routes),
    )
    .await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[actix_rt::test]
  async fn checkout_without_identity_is_unauthorized() {
    let app = test::init_service(
      App::new()
        .app_data(web::Data::new(test_state()))
        .configure(configure_app_routes),
    )
    .await;
    let req = test::TestRequest::post()
      .uri("/api/v1/payments/checkout")
      .set_json(serde_json::json!({ "kind": "marketplace" }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[actix_rt::test]
  async fn checkout_of_an_empty_cart_conflicts() {
    let app = test::init_service(
      App::new()
        .app_data(web::Data::new(test_state()))
        .configure(configure_app_routes),
    )
    .await;
    let req = test::TestRequest::post()
      .uri("/api/v1/payments/checkout")
      .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
      .set_json(serde_json::json!({ "kind": "marketplace" }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[actix_rt::test]
  async fn forged_verification_is_unauthorized() {
    let app = test::init_service(
      App::new()
        .app_data(web::Data::new(test_state()))
        .configure(configure_app_routes),
    )
    .await;
    let req = test::TestRequest::post()
      .uri("/api/v1/payments/verify")
      .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
      .set_json(serde_json::json!({
        "gateway_order_ref": "order_local_x",
        "gateway_payment_ref": "pay_x",
        "signature": "00"
      }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[actix_rt::test]
  async fn webhook_needs_a_signature_and_a_configured_gateway() {
    let app = test::init_service(
      App::new()
        .app_data(web::Data::new(test_state()))
        .configure(configure_app_routes),
    )
    .await;

    let unsigned = test::TestRequest::post()
      .uri("/api/v1/payments/webhook")
      .set_payload("{}")
      .to_request();
    assert_eq!(test::call_service(&app, unsigned).await.status(), StatusCode::UNAUTHORIZED);

    let signed = test::TestRequest::post()
      .uri("/api/v1/payments/webhook")
      .insert_header((SIGNATURE_HEADER, "abc"))
      .set_payload("{}")
      .to_request();
    assert_eq!(
      test::call_service(&app, signed).await.status(),
      StatusCode::SERVICE_UNAVAILABLE
    );
  }
}
