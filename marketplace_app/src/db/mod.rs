// marketplace_app/src/db/mod.rs

//! Postgres access. `settlement_store` backs the settlement core; the other
//! modules serve the cart, order and booking endpoints directly.

pub mod bookings;
pub mod cart;
pub mod orders;
pub mod settlement_store;

pub use settlement_store::PgSettlementStore;

use krishi::SettlementError;

pub(crate) fn storage_error(err: sqlx::Error) -> SettlementError {
  SettlementError::storage(err)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// `23P01`: the booking exclusion constraint rejected an overlapping window.
pub(crate) fn is_exclusion_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23P01"))
}
