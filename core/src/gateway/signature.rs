// core/src/gateway/signature.rs

//! HMAC-SHA256 signing helpers shared by the gateway adapters.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{SettlementError, SettlementResult};

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded `HMAC-SHA256(secret, payload)`.
pub fn sign_hex(secret: &[u8], payload: &[u8]) -> SettlementResult<String> {
  let mut mac =
    HmacSha256::new_from_slice(secret).map_err(|_| SettlementError::Auth("Invalid signing secret".to_string()))?;
  mac.update(payload);
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compares `provided` with the expected hex signature in constant time.
pub fn verify_hex(secret: &[u8], payload: &[u8], provided: &str) -> SettlementResult<bool> {
  let expected = sign_hex(secret, payload)?;
  let expected_bytes = expected.as_bytes();
  let provided_bytes = provided.trim().as_bytes();

  // Length is not secret: always 64 hex chars for SHA-256.
  if expected_bytes.len() != provided_bytes.len() {
    return Ok(false);
  }
  Ok(expected_bytes.ct_eq(provided_bytes).into())
}

/// Payload the client callback signature covers: `"{order_ref}|{payment_ref}"`.
pub fn payment_payload(gateway_order_ref: &str, gateway_payment_ref: &str) -> String {
  format!("{}|{}", gateway_order_ref, gateway_payment_ref)
}

/// Signs a client callback the way the gateway's checkout widget does.
pub fn sign_payment(secret: &str, gateway_order_ref: &str, gateway_payment_ref: &str) -> SettlementResult<String> {
  sign_hex(
    secret.as_bytes(),
    payment_payload(gateway_order_ref, gateway_payment_ref).as_bytes(),
  )
}
