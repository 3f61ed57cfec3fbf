// marketplace_app/src/db/cart.rs
use chrono::Utc;
use krishi::model::{PricedCartLine, Product};
use sqlx::{FromRow, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{CartItem, CartLineRow};

#[derive(Debug, FromRow)]
struct ProductRow {
  id: Uuid,
  seller_id: Uuid,
  title: String,
  price_paise: i64,
  stock: i32,
  active: bool,
}

impl From<ProductRow> for Product {
  fn from(row: ProductRow) -> Self {
    Product {
      id: row.id,
      seller_id: row.seller_id,
      title: row.title,
      price_paise: row.price_paise,
      stock: row.stock,
      active: row.active,
    }
  }
}

/// Rules for putting `total_quantity` units of `product` in `buyer_id`'s cart.
pub fn check_line(product: &Product, buyer_id: Uuid, total_quantity: i32) -> Result<()> {
  if total_quantity <= 0 {
    return Err(AppError::Validation("Quantity must be positive".to_string()));
  }
  if !product.active {
    return Err(AppError::Conflict(format!("Product '{}' is not available", product.title)));
  }
  if product.seller_id == buyer_id {
    return Err(AppError::Validation("You cannot buy your own product".to_string()));
  }
  if total_quantity > product.stock {
    return Err(AppError::Conflict(format!(
      "Only {} units of '{}' in stock",
      product.stock, product.title
    )));
  }
  Ok(())
}

async fn product_by_id(pool: &PgPool, product_id: Uuid) -> Result<Product> {
  let row: Option<ProductRow> =
    sqlx::query_as("SELECT id, seller_id, title, price_paise, stock, active FROM products WHERE id = $1")
      .bind(product_id)
      .fetch_optional(pool)
      .await?;
  row
    .map(Product::from)
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))
}

pub async fn list(pool: &PgPool, buyer_id: Uuid) -> Result<Vec<PricedCartLine>> {
  let rows: Vec<CartLineRow> = sqlx::query_as(
    "SELECT c.id AS line_id, c.quantity, p.id AS product_id, p.seller_id, p.title, p.price_paise, p.stock, p.active \
     FROM cart_items c JOIN products p ON p.id = c.product_id \
     WHERE c.buyer_id = $1 ORDER BY c.added_at, c.id",
  )
  .bind(buyer_id)
  .fetch_all(pool)
  .await?;
  Ok(rows.into_iter().map(PricedCartLine::from).collect())
}

/// Adds to the existing line for the product, if there is one.
#[instrument(skip(pool), err(Display))]
pub async fn add(pool: &PgPool, buyer_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
  if quantity <= 0 {
    return Err(AppError::Validation("Quantity must be positive".to_string()));
  }
  let product = product_by_id(pool, product_id).await?;

  let existing: Option<(i32,)> =
    sqlx::query_as("SELECT quantity FROM cart_items WHERE buyer_id = $1 AND product_id = $2")
      .bind(buyer_id)
      .bind(product_id)
      .fetch_optional(pool)
      .await?;
  let total = existing.map_or(0, |(q,)| q) + quantity;
  check_line(&product, buyer_id, total)?;

  let item: CartItem = sqlx::query_as(
    "INSERT INTO cart_items (id, buyer_id, product_id, quantity, added_at) VALUES ($1, $2, $3, $4, $5) \
     ON CONFLICT (buyer_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
     RETURNING id, buyer_id, product_id, quantity, added_at",
  )
  .bind(Uuid::new_v4())
  .bind(buyer_id)
  .bind(product_id)
  .bind(quantity)
  .bind(Utc::now())
  .fetch_one(pool)
  .await?;

  info!(line_id = %item.id, quantity = item.quantity, "Cart line saved.");
  Ok(item)
}

#[instrument(skip(pool), err(Display))]
pub async fn update_quantity(pool: &PgPool, buyer_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartItem> {
  let line: Option<(Uuid,)> = sqlx::query_as("SELECT product_id FROM cart_items WHERE id = $1 AND buyer_id = $2")
    .bind(item_id)
    .bind(buyer_id)
    .fetch_optional(pool)
    .await?;
  let (product_id,) = line.ok_or_else(|| AppError::NotFound(format!("Cart item {} not found", item_id)))?;

  let product = product_by_id(pool, product_id).await?;
  check_line(&product, buyer_id, quantity)?;

  let item: CartItem = sqlx::query_as(
    "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND buyer_id = $2 \
     RETURNING id, buyer_id, product_id, quantity, added_at",
  )
  .bind(item_id)
  .bind(buyer_id)
  .bind(quantity)
  .fetch_one(pool)
  .await?;
  Ok(item)
}

pub async fn remove(pool: &PgPool, buyer_id: Uuid, item_id: Uuid) -> Result<()> {
  let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND buyer_id = $2")
    .bind(item_id)
    .bind(buyer_id)
    .execute(pool)
    .await?;
  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Cart item {} not found", item_id)));
  }
  Ok(())
}

pub async fn clear(pool: &PgPool, buyer_id: Uuid) -> Result<u64> {
  let result = sqlx::query("DELETE FROM cart_items WHERE buyer_id = $1")
    .bind(buyer_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected())
}
