// marketplace_app/src/models/listing.rs
use krishi::model::{ColdStorageListing, EquipmentListing};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct EquipmentRow {
  pub id: Uuid,
  pub owner_id: Uuid,
  pub name: String,
  pub available: bool,
  pub rate_per_hour_paise: i64,
  pub rate_per_day_paise: Option<i64>,
}

impl From<EquipmentRow> for EquipmentListing {
  fn from(row: EquipmentRow) -> Self {
    EquipmentListing {
      id: row.id,
      owner_id: row.owner_id,
      name: row.name,
      available: row.available,
      rate_per_hour_paise: row.rate_per_hour_paise,
      rate_per_day_paise: row.rate_per_day_paise,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct ColdStorageRow {
  pub id: Uuid,
  pub owner_id: Uuid,
  pub name: String,
  pub active: bool,
  pub capacity_tons: i32,
  pub available_capacity_tons: i32,
  pub rate_per_ton_per_day_paise: i64,
}

impl From<ColdStorageRow> for ColdStorageListing {
  fn from(row: ColdStorageRow) -> Self {
    ColdStorageListing {
      id: row.id,
      owner_id: row.owner_id,
      name: row.name,
      active: row.active,
      capacity_tons: row.capacity_tons,
      available_capacity_tons: row.available_capacity_tons,
      rate_per_ton_per_day_paise: row.rate_per_ton_per_day_paise,
    }
  }
}
