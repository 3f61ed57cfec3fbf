// core/src/model/catalog.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::SettlementError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
  pub id: Uuid,
  pub seller_id: Uuid,
  pub title: String,
  pub price_paise: i64,
  pub stock: i32,
  pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub added_at: DateTime<Utc>,
}

/// A cart line joined with the current catalog entry, as read at checkout.
#[derive(Debug, Clone)]
pub struct PricedCartLine {
  pub line_id: Uuid,
  pub quantity: i32,
  pub product: Product,
}

impl PricedCartLine {
  pub fn line_total_paise(&self) -> i64 {
    i64::from(self.quantity) * self.product.price_paise
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  Equipment,
  ColdStorage,
}

impl ResourceKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResourceKind::Equipment => "equipment",
      ResourceKind::ColdStorage => "cold_storage",
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ResourceKind {
  type Err = SettlementError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "equipment" => Ok(ResourceKind::Equipment),
      "cold_storage" => Ok(ResourceKind::ColdStorage),
      other => Err(SettlementError::Validation(format!("'{}' is not a valid ResourceKind", other))),
    }
  }
}

/// Identifies a bookable resource. Equipment and cold-storage ids live in
/// separate tables, so the kind is part of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
  pub kind: ResourceKind,
  pub id: Uuid,
}

impl ResourceRef {
  pub fn equipment(id: Uuid) -> Self {
    Self { kind: ResourceKind::Equipment, id }
  }

  pub fn cold_storage(id: Uuid) -> Self {
    Self { kind: ResourceKind::ColdStorage, id }
  }
}

impl fmt::Display for ResourceRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.kind, self.id)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentListing {
  pub id: Uuid,
  pub owner_id: Uuid,
  pub name: String,
  pub available: bool,
  pub rate_per_hour_paise: i64,
  /// Owners may leave the daily rate unset; long rentals then bill hourly.
  pub rate_per_day_paise: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColdStorageListing {
  pub id: Uuid,
  pub owner_id: Uuid,
  pub name: String,
  pub active: bool,
  pub capacity_tons: i32,
  pub available_capacity_tons: i32,
  pub rate_per_ton_per_day_paise: i64,
}
