// marketplace_app/src/models/mod.rs

//! Row types as they come out of Postgres, with conversions into the
//! settlement core's domain values. Status text is parsed here, so a
//! non-canonical value in the database surfaces as an error instead of
//! leaking further in.

pub mod booking;
pub mod cart_item;
pub mod listing;
pub mod order;
pub mod session;

pub use booking::BookingRow;
pub use cart_item::{CartItem, CartLineRow, CartView};
pub use listing::{ColdStorageRow, EquipmentRow};
pub use order::{OrderItemRow, OrderRow};
pub use session::SessionRow;
