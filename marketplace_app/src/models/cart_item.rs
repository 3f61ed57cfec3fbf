// marketplace_app/src/models/cart_item.rs

use chrono::{DateTime, Utc};
use krishi::model::{PricedCartLine, Product};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartItem {
  pub id: Uuid,
  pub buyer_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub added_at: DateTime<Utc>,
}

/// A cart line joined with its product row.
#[derive(Debug, Clone, FromRow)]
pub struct CartLineRow {
  pub line_id: Uuid,
  pub quantity: i32,
  pub product_id: Uuid,
  pub seller_id: Uuid,
  pub title: String,
  pub price_paise: i64,
  pub stock: i32,
  pub active: bool,
}

impl From<CartLineRow> for PricedCartLine {
  fn from(row: CartLineRow) -> Self {
    PricedCartLine {
      line_id: row.line_id,
      quantity: row.quantity,
      product: Product {
        id: row.product_id,
        seller_id: row.seller_id,
        title: row.title,
        price_paise: row.price_paise,
        stock: row.stock,
        active: row.active,
      },
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
  pub id: Uuid,
  pub product_id: Uuid,
  pub seller_id: Uuid,
  pub title: String,
  pub quantity: i32,
  pub unit_price_paise: i64,
  pub line_total_paise: i64,
  pub in_stock: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
  pub items: Vec<CartLineView>,
  pub total_paise: i64,
}

impl CartView {
  pub fn from_lines(lines: Vec<PricedCartLine>) -> Self {
    let items: Vec<CartLineView> = lines
      .into_iter()
      .map(|line| CartLineView {
        id: line.line_id,
        line_total_paise: line.line_total_paise(),
        in_stock: line.product.active && line.quantity <= line.product.stock,
        product_id: line.product.id,
        seller_id: line.product.seller_id,
        title: line.product.title,
        quantity: line.quantity,
        unit_price_paise: line.product.price_paise,
      })
      .collect();
    let total_paise = items.iter().map(|i| i.line_total_paise).sum();
    CartView { items, total_paise }
  }
}
