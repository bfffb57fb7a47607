//! Opaque object addresses.
//!
//! An address is SHA-256 over a fresh UUIDv7, 16 bytes of OS randomness,
//! the current time in nanoseconds and the payload, rendered as 64
//! lowercase hex chars.
//! Because fresh entropy goes into every digest, two uploads of the same
//! bytes get different addresses: this is an id generator, not dedup.

use chrono::Utc;
use rand::TryRngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Hex length of a SHA-256 digest.
pub const IDENTITY_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

/// Generate a fresh address for `payload`.
pub fn new_identity(payload: &[u8]) -> Result<String, AddressError> {
    let random = os_entropy()?;
    let nonce = Uuid::now_v7();
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(nonce.hyphenated().to_string().as_bytes());
    hasher.update(random);
    hasher.update(now.to_string().as_bytes());
    hasher.update(payload);
    Ok(hex::encode(hasher.finalize()))
}

/// True if `s` has the shape of an address (64 lowercase hex chars).
pub fn is_valid_identity(s: &str) -> bool {
    s.len() == IDENTITY_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// 128 bits straight from the OS. Failing here fails the upload.
fn os_entropy() -> Result<[u8; 16], AddressError> {
    let mut random = [0u8; 16];
    rand::rngs::OsRng
        .try_fill_bytes(&mut random)
        .map_err(|e| AddressError::Entropy(e.to_string()))?;
    Ok(random)
}
