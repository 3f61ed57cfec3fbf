// marketplace_app/src/web/handlers/mod.rs

pub mod booking_handlers;
pub mod cart_handlers;
pub mod order_handlers;
pub mod payment_handlers;
pub mod webhook_handlers;
