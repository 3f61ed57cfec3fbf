// tests/notification_tests.rs
mod common;

use chrono::{Duration, Utc};
use common::*;
use krishi::model::{CheckoutRequest, OrderStatus, PaymentStatus, PendingPaymentSession};
use krishi::{
  ErrorKind, GatewayConfig, InMemorySettlementStore, NotificationOutcome, PaymentSessionManager, SettlementConfig,
  SettlementStore,
};
use std::sync::Arc;

async fn cart_checkout(fx: &Fixture) -> String {
  let p1 = fx.product(2_500, 10);
  fx.store.add_to_cart(fx.buyer, p1.id, 4);
  fx.manager
    .begin_checkout(
      fx.buyer,
      CheckoutRequest::Marketplace {
        delivery_address: None,
        delivery_phone: None,
      },
    )
    .await
    .unwrap()
    .gateway_order_ref
}

async fn notify(fx: &Fixture, event: &str, order_ref: &str, payment_ref: &str) -> krishi::SettlementResult<NotificationOutcome> {
  let body = webhook_body(event, order_ref, payment_ref);
  fx.manager.handle_notification(&body, &webhook_signature(&body)).await
}

#[tokio::test]
async fn capture_before_client_callback_creates_nothing() {
  let fx = Fixture::new();
  let order_ref = cart_checkout(&fx).await;

  let outcome = notify(&fx, "payment.captured", &order_ref, "pay_1").await.unwrap();
  assert_eq!(outcome, NotificationOutcome::AwaitingClientVerification);
  assert!(fx.store.orders().is_empty());
  assert_eq!(fx.store.session_count(), 1);

  // The client path still settles normally afterwards.
  let settled = fx
    .manager
    .verify_and_settle(fx.buyer, confirmation(&order_ref, "pay_1"))
    .await
    .unwrap();
  assert_eq!(settled.orders.len(), 1);
}

#[tokio::test]
async fn capture_after_settlement_is_idempotent() {
  let fx = Fixture::new();
  let order_ref = cart_checkout(&fx).await;
  fx.manager
    .verify_and_settle(fx.buyer, confirmation(&order_ref, "pay_1"))
    .await
    .unwrap();

  for _ in 0..2 {
    let outcome = notify(&fx, "payment.captured", &order_ref, "pay_1").await.unwrap();
    assert_eq!(outcome, NotificationOutcome::Captured { orders: 1, bookings: 0 });
  }
  let orders = fx.store.orders();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].status, OrderStatus::Confirmed);
  assert_eq!(orders[0].payment_status, PaymentStatus::Captured);
}

#[tokio::test]
async fn failed_payment_discards_pending_session() {
  let fx = Fixture::new();
  let order_ref = cart_checkout(&fx).await;

  let outcome = notify(&fx, "payment.failed", &order_ref, "pay_1").await.unwrap();
  assert_eq!(outcome, NotificationOutcome::SessionDiscarded);
  assert_eq!(fx.store.session_count(), 0);
  assert!(fx.store.orders().is_empty());

  let again = notify(&fx, "payment.failed", &order_ref, "pay_1").await.unwrap();
  assert_eq!(again, NotificationOutcome::NothingToDo);
}

#[tokio::test]
async fn failure_after_settlement_keeps_records() {
  let fx = Fixture::new();
  let order_ref = cart_checkout(&fx).await;
  fx.manager
    .verify_and_settle(fx.buyer, confirmation(&order_ref, "pay_1"))
    .await
    .unwrap();

  let outcome = notify(&fx, "payment.failed", &order_ref, "pay_2").await.unwrap();
  assert_eq!(outcome, NotificationOutcome::NothingToDo);
  assert_eq!(fx.store.orders().len(), 1);
}

#[tokio::test]
async fn unknown_reference_and_event_are_acknowledged() {
  let fx = Fixture::new();
  let outcome = notify(&fx, "payment.captured", "order_unknown", "pay_x").await.unwrap();
  assert_eq!(outcome, NotificationOutcome::NothingToDo);

  let outcome = notify(&fx, "refund.processed", "order_unknown", "pay_x").await.unwrap();
  assert_eq!(
    outcome,
    NotificationOutcome::Ignored {
      event: "refund.processed".to_string()
    }
  );
}

#[tokio::test]
async fn bad_signature_is_rejected_without_side_effects() {
  let fx = Fixture::new();
  let order_ref = cart_checkout(&fx).await;

  let body = webhook_body("payment.failed", &order_ref, "pay_1");
  let err = fx.manager.handle_notification(&body, "deadbeef").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Auth);
  assert_eq!(fx.store.session_count(), 1);

  // Signature over different bytes of the same event.
  let pretty = serde_json::to_vec_pretty(&serde_json::from_slice::<serde_json::Value>(&body).unwrap()).unwrap();
  let err = fx
    .manager
    .handle_notification(&pretty, &webhook_signature(&body))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Auth);
}

#[tokio::test]
async fn notifications_are_refused_when_payments_are_disabled() {
  setup_tracing();
  let store = Arc::new(InMemorySettlementStore::new());
  let gateway = krishi::gateway_from_config(&GatewayConfig::default()).unwrap();
  let manager = PaymentSessionManager::new(store, gateway, SettlementConfig::default());

  let body = webhook_body("payment.captured", "order_local_1", "pay_1");
  let err = manager
    .handle_notification(&body, &webhook_signature(&body))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Upstream);
}

#[tokio::test]
async fn purge_removes_only_abandoned_sessions() {
  let fx = Fixture::new();
  let fresh_ref = cart_checkout(&fx).await;

  let stale = PendingPaymentSession::new(
    fx.buyer,
    "order_stale".to_string(),
    "INR".to_string(),
    fx.store
      .find_session(&fresh_ref, None)
      .await
      .unwrap()
      .unwrap()
      .snapshot,
    Utc::now() - Duration::hours(30),
  );
  fx.store.insert_session(&stale).await.unwrap();
  assert_eq!(fx.store.session_count(), 2);

  assert_eq!(fx.manager.purge_abandoned_sessions().await.unwrap(), 1);
  assert!(fx.store.find_session("order_stale", None).await.unwrap().is_none());
  assert!(fx.store.find_session(&fresh_ref, None).await.unwrap().is_some());
}
