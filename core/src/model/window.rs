// core/src/model/window.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SettlementError, SettlementResult};

/// Half-open reservation window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

impl TimeWindow {
  /// Builds a well-formed window; `start` must be strictly before `end`.
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> SettlementResult<Self> {
    if start >= end {
      return Err(SettlementError::Validation(
        "Start time must be before end time".to_string(),
      ));
    }
    Ok(Self { start, end })
  }

  /// Rejects windows that begin before `now`.
  pub fn not_in_past(self, now: DateTime<Utc>) -> SettlementResult<Self> {
    if self.start < now {
      return Err(SettlementError::Validation(
        "Start time cannot be in the past".to_string(),
      ));
    }
    Ok(self)
  }

  /// `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && s2 < e1`; touching ends do not.
  pub fn overlaps(&self, other: &TimeWindow) -> bool {
    self.start < other.end && other.start < self.end
  }

  /// Exact length in seconds. Sub-second precision is dropped.
  pub fn duration_seconds(&self) -> i64 {
    (self.end - self.start).num_seconds()
  }

  /// Whole days covered, never less than one.
  pub fn whole_days(&self) -> i64 {
    (self.end - self.start).num_days().max(1)
  }
}
