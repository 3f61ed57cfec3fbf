// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Errors raised by the step pipeline engine itself, as opposed to the
/// handlers it runs. A pipeline's own error type must be `From<PipelineError>`.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Internal pipeline error: {0}")]
  Internal(String),
}

/// Machine-checkable classification of a [`SettlementError`].
///
/// Callers (the HTTP layer, tests) branch on the kind rather than on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  Validation,
  Conflict,
  Auth,
  NotFound,
  Upstream,
  /// Payment was captured but the business record cannot be created safely.
  Consistency,
  Storage,
  Pipeline,
}

#[derive(Debug, Error)]
pub enum SettlementError {
  /// Malformed or missing input, rejected before any gateway call or write.
  #[error("Validation error: {0}")]
  Validation(String),

  /// Empty cart, overlapping booking, unavailable capacity.
  #[error("Conflict: {0}")]
  Conflict(String),

  /// Signature mismatch or a caller that may not act on the resource.
  #[error("Authentication failed: {0}")]
  Auth(String),

  #[error("Not found: {0}")]
  NotFound(String),

  /// Gateway unreachable, rejected the request, or payments are disabled.
  #[error("Payment gateway error: {0}")]
  Upstream(String),

  /// Settlement-time re-validation failed after the gateway captured the money.
  /// Nothing was written; the pending session is kept for manual remediation.
  #[error("Payment {gateway_order_ref} captured but cannot be settled: {reason}")]
  Consistency { gateway_order_ref: String, reason: String },

  #[error("Storage failure. Source: {source}")]
  Storage {
    #[source]
    source: AnyhowError,
  },

  #[error("Settlement pipeline error: {0}")]
  Pipeline(#[from] PipelineError),
}

impl SettlementError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      SettlementError::Validation(_) => ErrorKind::Validation,
      SettlementError::Conflict(_) => ErrorKind::Conflict,
      SettlementError::Auth(_) => ErrorKind::Auth,
      SettlementError::NotFound(_) => ErrorKind::NotFound,
      SettlementError::Upstream(_) => ErrorKind::Upstream,
      SettlementError::Consistency { .. } => ErrorKind::Consistency,
      SettlementError::Storage { .. } => ErrorKind::Storage,
      SettlementError::Pipeline(_) => ErrorKind::Pipeline,
    }
  }

  /// True for the two outcomes a losing booking racer can observe:
  /// a quote-time overlap or a settle-time consistency failure.
  pub fn is_conflict(&self) -> bool {
    matches!(self.kind(), ErrorKind::Conflict | ErrorKind::Consistency)
  }

  /// Only a settle-time consistency failure leaves captured money without a record.
  pub fn requires_refund(&self) -> bool {
    matches!(self, SettlementError::Consistency { .. })
  }

  pub fn storage(source: impl Into<AnyhowError>) -> Self {
    SettlementError::Storage { source: source.into() }
  }
}

// Storage backends report through anyhow; anything they hand us is a persistence failure.
impl From<AnyhowError> for SettlementError {
  fn from(err: AnyhowError) -> Self {
    // A backend may have wrapped one of ours on the way up; keep its kind.
    match err.downcast::<SettlementError>() {
      Ok(settlement_err) => settlement_err,
      Err(err) => SettlementError::Storage { source: err },
    }
  }
}

pub type SettlementResult<T, E = SettlementError> = std::result::Result<T, E>;
