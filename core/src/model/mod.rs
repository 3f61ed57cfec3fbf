// core/src/model/mod.rs

//! Domain values shared by the settlement core and its storage backends.
//!
//! Money is always integer paise (`i64`). Enumerations have exactly one
//! canonical spelling (lowercase) used in JSON, SQL and `FromStr`.

pub mod catalog;
pub mod records;
pub mod session;
pub mod status;
pub mod window;

pub use catalog::{CartLine, ColdStorageListing, EquipmentListing, PricedCartLine, Product, ResourceKind, ResourceRef};
pub use records::{BookingRecord, OrderItemRecord, OrderRecord, SettledRecords};
pub use session::{
  BillingBasis, BookingQuote, CheckoutKind, CheckoutRequest, DeliveryDetails, MarketplaceSnapshot,
  PendingPaymentSession, SellerGroup, Snapshot, SnapshotLine,
};
pub use status::{BookingStatus, OrderStatus, PaymentStatus};
pub use window::TimeWindow;
