/// Amora Crypto Library
///
/// At-rest encryption for message text and photo blobs: AES-256-GCM with a
/// fresh random nonce per payload, keyed by a per-deployment secret.
///
/// Text tokens serialize as `nonceHex:cipherHex` so rows written before
/// encryption was introduced still read back verbatim (see `TextPayload`).
pub mod codec;
pub mod keys;

pub use codec::{Codec, TextPayload};
pub use keys::derive_key;
