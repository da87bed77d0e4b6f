use sha2::{Digest, Sha256};

/// Derive the 256-bit content key from the configured deployment secret.
///
/// Deterministic: the same secret always yields the same key, so rows sealed
/// by one process remain readable after a restart.
pub fn derive_key(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}
