//! Webhook signature check: hex HMAC-SHA256 of the raw body.
//!
//! SonarQube sends the digest in `X-Sonar-Webhook-HMAC-SHA256` as plain
//! lowercase hex (no `sha256=` prefix). Verification must run on the exact
//! bytes received, before any parsing.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "X-Sonar-Webhook-HMAC-SHA256";

const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex HMAC-SHA256 of `payload` keyed with `secret`.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `provided` against the payload digest.
///
/// `provided` must be exactly the lowercase hex digest; the byte comparison
/// runs in constant time and malformed headers simply fail.
pub fn verify_signature(payload: &[u8], provided: &str, secret: &[u8]) -> bool {
    if !is_lowercase_hex_digest(provided) {
        return false;
    }
    let Ok(expected) = hex::decode(provided) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

// hex::decode accepts both cases; the header format does not.
fn is_lowercase_hex_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
