//! # Webhook Signature Verification
//!
//! Providers sign webhook bodies with a per-provider shared secret:
//! HMAC-SHA256 over the raw body, hex-encoded in a header. Verification
//! happens before the payload is even parsed.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::adapter::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex HMAC-SHA256 signature for a body.
///
/// Used by the sandbox provider and by tests to produce valid webhooks.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 signature over a body.
///
/// Constant-time comparison via the `hmac` crate's `verify_slice`.
pub fn verify(secret: &[u8], body: &[u8], signature_hex: &str) -> Result<(), GatewayError> {
    let expected = hex::decode(signature_hex.trim())
        .map_err(|e| GatewayError::BadSignature(format!("signature is not hex: {e}")))?;
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| GatewayError::BadSignature(format!("bad webhook secret: {e}")))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| GatewayError::BadSignature("HMAC mismatch".to_string()))
}
