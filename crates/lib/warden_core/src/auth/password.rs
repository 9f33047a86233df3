//! Password hashing via SHA-256 pre-digest + bcrypt.
//!
//! bcrypt only looks at the first 72 bytes of its input. Digesting the
//! plaintext first (and base64-encoding the digest so it never contains a
//! NUL byte) lets passwords of any length hash without truncation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

fn prehash(password: &str) -> String {
    STANDARD.encode(Sha256::digest(password.as_bytes()))
}

/// Hash a password. Every call embeds a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(prehash(password), BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a stored hash. Malformed hashes verify as `false`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(prehash(password), hash).unwrap_or(false)
}
