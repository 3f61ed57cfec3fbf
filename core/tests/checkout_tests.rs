// tests/checkout_tests.rs
mod common;

use common::*;
use krishi::model::{BillingBasis, CheckoutRequest, Snapshot};
use krishi::{ErrorKind, GatewayConfig, InMemorySettlementStore, PaymentSessionManager, SettlementConfig, SettlementStore};
use std::sync::Arc;
use uuid::Uuid;

fn marketplace() -> CheckoutRequest {
  CheckoutRequest::Marketplace {
    delivery_address: Some("Plot 12, Hadapsar, Pune".to_string()),
    delivery_phone: Some("+919800000000".to_string()),
  }
}

#[tokio::test]
async fn marketplace_checkout_quotes_and_persists_session_only() {
  let fx = Fixture::new();
  let p1 = fx.product(5_000, 10);
  fx.store.add_to_cart(fx.buyer, p1.id, 2);

  let receipt = fx.manager.begin_checkout(fx.buyer, marketplace()).await.unwrap();

  assert_eq!(receipt.amount_paise, 15_000);
  assert_eq!(receipt.currency, "INR");
  assert_eq!(receipt.gateway_order_ref, "order_test_1");
  assert!(receipt.payment_enabled);

  let session = fx
    .store
    .find_session(&receipt.gateway_order_ref, Some(fx.buyer))
    .await
    .unwrap()
    .expect("session persisted");
  let Snapshot::Marketplace(snapshot) = &session.snapshot else {
    panic!("expected marketplace snapshot");
  };
  assert_eq!(snapshot.seller_groups[0].lines[0].quantity, 2);
  assert_eq!(snapshot.delivery.address.as_deref(), Some("Plot 12, Hadapsar, Pune"));

  // Nothing durable yet; cart untouched.
  assert!(fx.store.orders().is_empty());
  assert_eq!(fx.store.cart_len(fx.buyer), 1);
}

#[tokio::test]
async fn empty_cart_is_a_conflict_and_never_reaches_the_gateway() {
  let fx = Fixture::new();
  let err = fx.manager.begin_checkout(fx.buyer, marketplace()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
  assert_eq!(fx.gateway.issued(), 0);
  assert_eq!(fx.store.session_count(), 0);
}

#[tokio::test]
async fn buying_your_own_product_is_rejected() {
  let fx = Fixture::new();
  let p1 = fx.product(5_000, 10);
  fx.store.add_to_cart(fx.seller, p1.id, 1);

  let err = fx.manager.begin_checkout(fx.seller, marketplace()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn gateway_failure_leaves_no_session() {
  let fx = Fixture::new();
  let p1 = fx.product(5_000, 10);
  fx.store.add_to_cart(fx.buyer, p1.id, 1);
  fx.gateway.fail_orders(true);

  let err = fx.manager.begin_checkout(fx.buyer, marketplace()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Upstream);
  assert_eq!(fx.store.session_count(), 0);
}

#[tokio::test]
async fn nine_hour_equipment_rental_bills_one_day() {
  let fx = Fixture::new();
  let tractor = fx.equipment(20_000, Some(120_000));

  let receipt = fx
    .manager
    .begin_checkout(
      fx.buyer,
      CheckoutRequest::EquipmentBooking {
        equipment_id: tractor.id,
        start: day_at(10, 10),
        end: day_at(10, 19),
      },
    )
    .await
    .unwrap();
  assert_eq!(receipt.amount_paise, 120_000);

  let session = fx.store.find_session(&receipt.gateway_order_ref, None).await.unwrap().unwrap();
  let quote = session.snapshot.booking_quote().unwrap();
  assert_eq!(quote.billing, BillingBasis::Daily { days: 1 });
  assert!(fx.store.bookings().is_empty());
}

#[tokio::test]
async fn malformed_or_past_windows_are_validation_errors() {
  let fx = Fixture::new();
  let tractor = fx.equipment(20_000, None);

  let inverted = CheckoutRequest::EquipmentBooking {
    equipment_id: tractor.id,
    start: day_at(5, 12),
    end: day_at(5, 9),
  };
  let past = CheckoutRequest::EquipmentBooking {
    equipment_id: tractor.id,
    start: day_at(-2, 9),
    end: day_at(-2, 12),
  };
  for request in [inverted, past] {
    let err = fx.manager.begin_checkout(fx.buyer, request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
  }
  assert_eq!(fx.gateway.issued(), 0);
}

#[tokio::test]
async fn unknown_or_unavailable_equipment_is_not_found() {
  let fx = Fixture::new();
  let request = CheckoutRequest::EquipmentBooking {
    equipment_id: Uuid::new_v4(),
    start: day_at(3, 9),
    end: day_at(3, 10),
  };
  let err = fx.manager.begin_checkout(fx.buyer, request).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn overlapping_window_is_a_conflict_at_quote_time() {
  let fx = Fixture::new();
  let tractor = fx.equipment(20_000, None);
  let other_buyer = Uuid::new_v4();

  let first = fx
    .manager
    .begin_checkout(
      other_buyer,
      CheckoutRequest::EquipmentBooking {
        equipment_id: tractor.id,
        start: day_at(7, 8),
        end: day_at(7, 12),
      },
    )
    .await
    .unwrap();
  fx.manager
    .verify_and_settle(other_buyer, confirmation(&first.gateway_order_ref, "pay_first"))
    .await
    .unwrap();

  let overlapping = CheckoutRequest::EquipmentBooking {
    equipment_id: tractor.id,
    start: day_at(7, 11),
    end: day_at(7, 14),
  };
  let err = fx.manager.begin_checkout(fx.buyer, overlapping).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  // Touching the end of the existing booking is fine.
  let adjacent = CheckoutRequest::EquipmentBooking {
    equipment_id: tractor.id,
    start: day_at(7, 12),
    end: day_at(7, 14),
  };
  assert!(fx.manager.begin_checkout(fx.buyer, adjacent).await.is_ok());
}

#[tokio::test]
async fn cold_storage_checkout_checks_capacity_and_prices_ton_days() {
  let fx = Fixture::new();
  let facility = fx.cold_storage(50, 2_000);

  let receipt = fx
    .manager
    .begin_checkout(
      fx.buyer,
      CheckoutRequest::ColdStorageBooking {
        facility_id: facility.id,
        quantity_tons: 10,
        start: day_at(4, 0),
        end: day_at(9, 0),
      },
    )
    .await
    .unwrap();
  assert_eq!(receipt.amount_paise, 10 * 2_000 * 5);

  let too_much = CheckoutRequest::ColdStorageBooking {
    facility_id: facility.id,
    quantity_tons: 51,
    start: day_at(20, 0),
    end: day_at(21, 0),
  };
  let err = fx.manager.begin_checkout(fx.buyer, too_much).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn payment_disabled_mode_issues_local_placeholders() {
  setup_tracing();
  let store = Arc::new(InMemorySettlementStore::new());
  let gateway = krishi::gateway_from_config(&GatewayConfig::default()).unwrap();
  let manager = PaymentSessionManager::new(store.clone(), gateway, SettlementConfig::default());

  let tractor = krishi::model::EquipmentListing {
    id: Uuid::new_v4(),
    owner_id: Uuid::new_v4(),
    name: "Harvester".to_string(),
    available: true,
    rate_per_hour_paise: 60_000,
    rate_per_day_paise: None,
  };
  store.insert_equipment(tractor.clone());

  let receipt = manager
    .begin_checkout(
      Uuid::new_v4(),
      CheckoutRequest::EquipmentBooking {
        equipment_id: tractor.id,
        start: day_at(2, 6),
        end: day_at(2, 8),
      },
    )
    .await
    .unwrap();
  assert!(!receipt.payment_enabled);
  assert!(receipt.key_id.is_none());
  assert!(receipt.gateway_order_ref.starts_with("order_local_"));
  assert_eq!(receipt.amount_paise, 120_000);
}
