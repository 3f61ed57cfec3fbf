// core/src/pricing.rs

//! Quote computation. Everything here is pure: listings and cart lines come in,
//! a priced snapshot comes out. Availability against existing bookings is the
//! manager's job since it needs the store.

use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{SettlementError, SettlementResult};
use crate::model::{
  BillingBasis, BookingQuote, ColdStorageListing, DeliveryDetails, EquipmentListing, MarketplaceSnapshot,
  PricedCartLine, ResourceRef, SellerGroup, SnapshotLine, TimeWindow,
};

const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Groups cart lines by seller and prices each group, adding one delivery
/// charge per seller. Group order follows the first appearance of each seller
/// in the cart.
pub fn quote_marketplace(
  buyer_id: Uuid,
  lines: &[PricedCartLine],
  delivery_charge_paise: i64,
  delivery: DeliveryDetails,
) -> SettlementResult<MarketplaceSnapshot> {
  if lines.is_empty() {
    return Err(SettlementError::Conflict("Cart is empty".to_string()));
  }

  let mut groups: Vec<SellerGroup> = Vec::new();
  let mut index_by_seller: HashMap<Uuid, usize> = HashMap::new();

  for line in lines {
    let product = &line.product;
    if !product.active {
      return Err(SettlementError::Conflict(format!(
        "Product '{}' is no longer available",
        product.title
      )));
    }
    if product.seller_id == buyer_id {
      return Err(SettlementError::Validation(format!(
        "Cannot purchase your own product '{}'",
        product.title
      )));
    }
    if line.quantity <= 0 {
      return Err(SettlementError::Validation(format!(
        "Quantity for '{}' must be positive",
        product.title
      )));
    }
    if line.quantity > product.stock {
      return Err(SettlementError::Conflict(format!(
        "Insufficient stock for '{}': requested {}, available {}",
        product.title, line.quantity, product.stock
      )));
    }

    let idx = *index_by_seller.entry(product.seller_id).or_insert_with(|| {
      groups.push(SellerGroup {
        seller_id: product.seller_id,
        lines: Vec::new(),
        subtotal_paise: 0,
        delivery_charge_paise,
        total_paise: 0,
      });
      groups.len() - 1
    });

    let line_total_paise = line.line_total_paise();
    let group = &mut groups[idx];
    group.lines.push(SnapshotLine {
      product_id: product.id,
      title: product.title.clone(),
      quantity: line.quantity,
      unit_price_paise: product.price_paise,
      line_total_paise,
    });
    group.subtotal_paise += line_total_paise;
  }

  for group in &mut groups {
    group.total_paise = group.subtotal_paise + group.delivery_charge_paise;
  }

  Ok(MarketplaceSnapshot {
    seller_groups: groups,
    delivery,
  })
}

/// Prices an equipment rental.
///
/// Rentals longer than `daily_threshold_hours` bill whole days (rounded up) when
/// the listing has a daily rate. Everything else bills hourly, pro-rated per
/// second and rounded to the nearest paisa.
pub fn quote_equipment(
  buyer_id: Uuid,
  listing: &EquipmentListing,
  window: TimeWindow,
  daily_threshold_hours: i64,
) -> SettlementResult<BookingQuote> {
  if !listing.available {
    return Err(SettlementError::NotFound(format!("Equipment {} is not available", listing.id)));
  }
  if listing.owner_id == buyer_id {
    return Err(SettlementError::Validation("Cannot book your own equipment".to_string()));
  }

  let seconds = window.duration_seconds();
  let (billing, rate_paise, total_paise) = match listing.rate_per_day_paise {
    Some(daily) if seconds > daily_threshold_hours * SECONDS_PER_HOUR => {
      let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
      (BillingBasis::Daily { days }, daily, daily * days)
    }
    _ => {
      let hourly = listing.rate_per_hour_paise;
      let total = (hourly * seconds + SECONDS_PER_HOUR / 2) / SECONDS_PER_HOUR;
      (BillingBasis::Hourly { seconds }, hourly, total)
    }
  };

  Ok(BookingQuote {
    resource: ResourceRef::equipment(listing.id),
    owner_id: listing.owner_id,
    window,
    quantity_tons: None,
    billing,
    rate_paise,
    total_paise,
  })
}

/// Prices cold storage as `tons × rate × days`, with at least one day billed.
pub fn quote_cold_storage(
  buyer_id: Uuid,
  listing: &ColdStorageListing,
  quantity_tons: i32,
  window: TimeWindow,
) -> SettlementResult<BookingQuote> {
  if !listing.active {
    return Err(SettlementError::NotFound(format!(
      "Cold storage facility {} is not available",
      listing.id
    )));
  }
  if listing.owner_id == buyer_id {
    return Err(SettlementError::Validation("Cannot book your own facility".to_string()));
  }
  if quantity_tons <= 0 {
    return Err(SettlementError::Validation("Quantity must be at least one ton".to_string()));
  }
  if quantity_tons > listing.available_capacity_tons {
    return Err(SettlementError::Conflict(format!(
      "Insufficient capacity: requested {} tons, available {} tons",
      quantity_tons, listing.available_capacity_tons
    )));
  }

  let days = window.whole_days();
  let rate_paise = listing.rate_per_ton_per_day_paise;
  Ok(BookingQuote {
    resource: ResourceRef::cold_storage(listing.id),
    owner_id: listing.owner_id,
    window,
    quantity_tons: Some(quantity_tons),
    billing: BillingBasis::PerTonDay { tons: quantity_tons, days },
    rate_paise,
    total_paise: i64::from(quantity_tons) * rate_paise * days,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Product;
  use chrono::{DateTime, Duration, TimeZone, Utc};

  fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, day, hour, minute, 0).unwrap()
  }

  fn product(seller_id: Uuid, price_paise: i64, stock: i32) -> Product {
    Product {
      id: Uuid::new_v4(),
      seller_id,
      title: "Basmati rice (25kg)".to_string(),
      price_paise,
      stock,
      active: true,
    }
  }

  fn line(product: Product, quantity: i32) -> PricedCartLine {
    PricedCartLine {
      line_id: Uuid::new_v4(),
      quantity,
      product,
    }
  }

  fn tractor(owner_id: Uuid, daily: Option<i64>) -> EquipmentListing {
    EquipmentListing {
      id: Uuid::new_v4(),
      owner_id,
      name: "Tractor 45HP".to_string(),
      available: true,
      rate_per_hour_paise: 20_000,
      rate_per_day_paise: daily,
    }
  }

  #[test]
  fn single_seller_cart_adds_one_delivery_charge() {
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let snapshot = quote_marketplace(
      buyer,
      &[line(product(seller, 5_000, 10), 2)],
      5_000,
      DeliveryDetails::default(),
    )
    .unwrap();

    assert_eq!(snapshot.seller_groups.len(), 1);
    let group = &snapshot.seller_groups[0];
    assert_eq!(group.subtotal_paise, 10_000);
    assert_eq!(group.delivery_charge_paise, 5_000);
    assert_eq!(group.total_paise, 15_000);
    assert_eq!(snapshot.total_paise(), 15_000);
  }

  #[test]
  fn lines_are_grouped_per_seller() {
    let buyer = Uuid::new_v4();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let lines = [
      line(product(a, 1_000, 10), 1),
      line(product(b, 2_000, 10), 3),
      line(product(a, 500, 10), 4),
    ];
    let snapshot = quote_marketplace(buyer, &lines, 5_000, DeliveryDetails::default()).unwrap();

    assert_eq!(snapshot.seller_groups.len(), 2);
    assert_eq!(snapshot.seller_groups[0].seller_id, a);
    assert_eq!(snapshot.seller_groups[0].lines.len(), 2);
    assert_eq!(snapshot.seller_groups[0].subtotal_paise, 3_000);
    assert_eq!(snapshot.seller_groups[1].subtotal_paise, 6_000);
    assert_eq!(snapshot.total_paise(), 3_000 + 6_000 + 2 * 5_000);
  }

  #[test]
  fn empty_cart_and_bad_lines_are_rejected() {
    let buyer = Uuid::new_v4();
    let empty = quote_marketplace(buyer, &[], 5_000, DeliveryDetails::default()).unwrap_err();
    assert!(matches!(empty, SettlementError::Conflict(_)));

    let own = quote_marketplace(buyer, &[line(product(buyer, 100, 5), 1)], 0, DeliveryDetails::default());
    assert!(matches!(own, Err(SettlementError::Validation(_))));

    let too_many = quote_marketplace(
      buyer,
      &[line(product(Uuid::new_v4(), 100, 2), 3)],
      0,
      DeliveryDetails::default(),
    );
    assert!(matches!(too_many, Err(SettlementError::Conflict(_))));

    let mut inactive = product(Uuid::new_v4(), 100, 5);
    inactive.active = false;
    let gone = quote_marketplace(buyer, &[line(inactive, 1)], 0, DeliveryDetails::default());
    assert!(matches!(gone, Err(SettlementError::Conflict(_))));
  }

  #[test]
  fn nine_hour_rental_with_daily_rate_bills_one_day() {
    let listing = tractor(Uuid::new_v4(), Some(120_000));
    let window = TimeWindow::new(at(1, 10, 0), at(1, 19, 0)).unwrap();
    let quote = quote_equipment(Uuid::new_v4(), &listing, window, 8).unwrap();

    assert_eq!(quote.billing, BillingBasis::Daily { days: 1 });
    assert_eq!(quote.total_paise, 120_000);
  }

  #[test]
  fn long_rentals_round_days_up() {
    let listing = tractor(Uuid::new_v4(), Some(120_000));
    let window = TimeWindow::new(at(1, 10, 0), at(2, 11, 0)).unwrap();
    let quote = quote_equipment(Uuid::new_v4(), &listing, window, 8).unwrap();
    assert_eq!(quote.billing, BillingBasis::Daily { days: 2 });
    assert_eq!(quote.total_paise, 240_000);
  }

  #[test]
  fn threshold_and_day_ceiling_count_seconds() {
    let listing = tractor(Uuid::new_v4(), Some(120_000));
    let start = at(1, 6, 0);

    let just_over_eight = TimeWindow::new(start, start + Duration::hours(8) + Duration::seconds(30)).unwrap();
    let quote = quote_equipment(Uuid::new_v4(), &listing, just_over_eight, 8).unwrap();
    assert_eq!(quote.billing, BillingBasis::Daily { days: 1 });
    assert_eq!(quote.total_paise, 120_000);

    let just_over_a_day = TimeWindow::new(start, start + Duration::hours(24) + Duration::seconds(30)).unwrap();
    let quote = quote_equipment(Uuid::new_v4(), &listing, just_over_a_day, 8).unwrap();
    assert_eq!(quote.billing, BillingBasis::Daily { days: 2 });
    assert_eq!(quote.total_paise, 240_000);

    let exactly_eight = TimeWindow::new(start, start + Duration::hours(8)).unwrap();
    let quote = quote_equipment(Uuid::new_v4(), &listing, exactly_eight, 8).unwrap();
    assert_eq!(quote.billing, BillingBasis::Hourly { seconds: 8 * 3_600 });
    assert_eq!(quote.total_paise, 160_000);
  }

  #[test]
  fn sub_minute_rentals_are_still_billed() {
    let listing = tractor(Uuid::new_v4(), Some(120_000));
    let start = at(1, 6, 0);
    let window = TimeWindow::new(start, start + Duration::seconds(59)).unwrap();
    let quote = quote_equipment(Uuid::new_v4(), &listing, window, 8).unwrap();
    assert_eq!(quote.billing, BillingBasis::Hourly { seconds: 59 });
    // 59 s at 20000/h = 327.8 paise
    assert_eq!(quote.total_paise, 328);
  }

  #[test]
  fn short_or_daily_less_rentals_bill_per_second() {
    let with_daily = tractor(Uuid::new_v4(), Some(120_000));
    let short = TimeWindow::new(at(1, 10, 0), at(1, 12, 30)).unwrap();
    let quote = quote_equipment(Uuid::new_v4(), &with_daily, short, 8).unwrap();
    assert_eq!(quote.billing, BillingBasis::Hourly { seconds: 150 * 60 });
    assert_eq!(quote.total_paise, 50_000);

    let hourly_only = EquipmentListing {
      rate_per_hour_paise: 10_001,
      ..tractor(Uuid::new_v4(), None)
    };
    let long = TimeWindow::new(at(1, 6, 0), at(1, 16, 1)).unwrap();
    let quote = quote_equipment(Uuid::new_v4(), &hourly_only, long, 8).unwrap();
    // 601 minutes at 10001/h = 100176.68 paise
    assert_eq!(quote.total_paise, 100_177);
  }

  #[test]
  fn own_or_unavailable_equipment_is_rejected() {
    let owner = Uuid::new_v4();
    let window = TimeWindow::new(at(1, 10, 0), at(1, 11, 0)).unwrap();
    let own = quote_equipment(owner, &tractor(owner, None), window, 8);
    assert!(matches!(own, Err(SettlementError::Validation(_))));

    let mut parked = tractor(Uuid::new_v4(), None);
    parked.available = false;
    let parked = quote_equipment(owner, &parked, window, 8);
    assert!(matches!(parked, Err(SettlementError::NotFound(_))));
  }

  #[test]
  fn cold_storage_bills_tons_times_days_with_capacity_check() {
    let listing = ColdStorageListing {
      id: Uuid::new_v4(),
      owner_id: Uuid::new_v4(),
      name: "Nashik cold store".to_string(),
      active: true,
      capacity_tons: 100,
      available_capacity_tons: 20,
      rate_per_ton_per_day_paise: 1_500,
    };
    let buyer = Uuid::new_v4();

    let three_days = TimeWindow::new(at(1, 0, 0), at(4, 0, 0)).unwrap();
    let quote = quote_cold_storage(buyer, &listing, 5, three_days).unwrap();
    assert_eq!(quote.billing, BillingBasis::PerTonDay { tons: 5, days: 3 });
    assert_eq!(quote.total_paise, 5 * 1_500 * 3);

    let two_hours = TimeWindow::new(at(1, 0, 0), at(1, 2, 0)).unwrap();
    assert_eq!(quote_cold_storage(buyer, &listing, 1, two_hours).unwrap().total_paise, 1_500);

    assert!(matches!(
      quote_cold_storage(buyer, &listing, 21, three_days),
      Err(SettlementError::Conflict(_))
    ));
    assert!(matches!(
      quote_cold_storage(buyer, &listing, 0, three_days),
      Err(SettlementError::Validation(_))
    ));
  }
}
