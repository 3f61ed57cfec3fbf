// core/src/model/status.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SettlementError;

/// Declares a lowercase-canonical enum with `as_str`, `Display` and a
/// validating `FromStr` for use at storage and wire boundaries.
macro_rules! canonical_enum {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum $name {
      $($variant),+
    }

    impl $name {
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      pub fn as_str(&self) -> &'static str {
        match self {
          $($name::$variant => $text),+
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl FromStr for $name {
      type Err = SettlementError;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $($text => Ok($name::$variant),)+
          other => Err(SettlementError::Validation(format!(
            "'{}' is not a valid {}",
            other,
            stringify!($name)
          ))),
        }
      }
    }
  };
}

canonical_enum!(
  /// Lifecycle of a settled order. Cancellation is a status, never a delete.
  OrderStatus {
    Created => "created",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
  }
);

canonical_enum!(
  PaymentStatus {
    Pending => "pending",
    Authorized => "authorized",
    Captured => "captured",
    Failed => "failed",
    Refunded => "refunded",
  }
);

canonical_enum!(
  /// Lifecycle of an equipment or cold-storage reservation.
  BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
  }
);

impl OrderStatus {
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Created, Confirmed)
        | (Created, Cancelled)
        | (Confirmed, Processing)
        | (Confirmed, Cancelled)
        | (Processing, Shipped)
        | (Processing, Cancelled)
        | (Shipped, Delivered)
        | (Delivered, Refunded)
        | (Cancelled, Refunded)
    )
  }

  /// Status a capture notification moves the order to. Orders already past
  /// confirmation keep their status.
  pub fn on_capture(self) -> OrderStatus {
    match self {
      OrderStatus::Created => OrderStatus::Confirmed,
      other => other,
    }
  }
}

impl PaymentStatus {
  /// Capture never overrides a refund; everything else converges on `Captured`.
  pub fn on_capture(self) -> PaymentStatus {
    match self {
      PaymentStatus::Refunded => PaymentStatus::Refunded,
      _ => PaymentStatus::Captured,
    }
  }
}

impl BookingStatus {
  pub fn can_transition_to(self, next: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
      (self, next),
      (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Active) | (Confirmed, Cancelled) | (Active, Completed)
    )
  }

  /// Whether a booking in this status reserves its time window.
  ///
  /// Bookings only exist after payment, so a pending booking is a paid one
  /// awaiting the owner and holds its window like a confirmed one.
  pub fn is_holding(self) -> bool {
    matches!(self, BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Active)
  }

  pub fn holding() -> &'static [BookingStatus] {
    &[BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Active]
  }
}
