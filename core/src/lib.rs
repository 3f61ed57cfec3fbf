// src/lib.rs

//! Krishi: payment settlement core of the agricultural marketplace.
//!
//! Turns a buyer's cart or booking request into a gateway order, then turns a
//! verified payment into durable orders or bookings exactly once:
//!  - Checkout snapshots priced data into a pending session keyed by the gateway reference.
//!  - Settlement verifies the payment signature and consumes the session atomically.
//!  - Gateway notifications reconcile capture/failure without ever creating records.
//!
//! Each operation is a small step pipeline (see [`pipeline`]) over shared context.
//! Persistence sits behind [`SettlementStore`]; the gateway behind [`PaymentGateway`].

pub mod config;
pub mod error;
pub mod gateway;
pub mod manager;
pub mod model;
pub mod pipeline;
pub mod pricing;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::config::{GatewayConfig, SettlementConfig};
pub use crate::error::{ErrorKind, PipelineError, SettlementError, SettlementResult};
pub use crate::gateway::{gateway_from_config, PaymentGateway, RemoteOrder};
pub use crate::manager::{CheckoutReceipt, NotificationOutcome, PaymentConfirmation, PaymentSessionManager};
pub use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult, StepDef};
pub use crate::store::{CommitOutcome, InMemorySettlementStore, SettlementStore};
