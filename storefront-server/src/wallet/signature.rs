//! Crypto Pay webhook signature
//!
//! `hex(HMAC-SHA256(key = SHA256(api_token), raw_body))`, sent in the
//! `crypto-pay-api-signature` header.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const SIGNATURE_HEADER: &str = "crypto-pay-api-signature";

type HmacSha256 = Hmac<Sha256>;

/// Webhook key derived from the API token
pub fn webhook_secret(api_token: &str) -> [u8; 32] {
    Sha256::digest(api_token.as_bytes()).into()
}

/// Hex signature of `body`
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature against `body`
pub fn verify(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
