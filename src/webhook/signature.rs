//! HMAC-SHA256 payload signatures.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Scheme prefix carried in the signature header
const SCHEME_PREFIX: &str = "sha256=";

/// Hex HMAC-SHA256 over the exact payload bytes
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    // new_from_slice only fails on zero-length keys for some MACs;
    // HMAC accepts any key length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Header value: `sha256=<hex>`
pub fn signature_header(payload: &[u8], secret: &str) -> String {
    format!("{}{}", SCHEME_PREFIX, sign_payload(payload, secret))
}

/// Constant-time verification. Accepts both `sha256=<hex>` and bare
/// hex header values.
pub fn verify_signature(payload: &[u8], header_value: &str, secret: &str) -> bool {
    let presented = header_value
        .strip_prefix(SCHEME_PREFIX)
        .unwrap_or(header_value);
    let expected = sign_payload(payload, secret);
    constant_time_eq(presented.as_bytes(), expected.as_bytes())
}
