use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use anyhow::{Result, anyhow, bail};

/// Nonce length for AES-256-GCM.
const NONCE_LEN: usize = 12;

/// Result of decrypting a text token.
///
/// `Fallback` carries the input verbatim: rows written before encryption was
/// introduced (or corrupted tokens) are delivered as-is rather than failing
/// the read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPayload {
    Plain(String),
    Fallback(String),
}

impl TextPayload {
    pub fn into_string(self) -> String {
        match self {
            TextPayload::Plain(s) | TextPayload::Fallback(s) => s,
        }
    }
}

/// Symmetric codec for message text and photo blobs.
pub struct Codec {
    key: [u8; 32],
}

impl Codec {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }

    /// Encrypt message text to a `nonceHex:cipherHex` token.
    /// Empty input passes through unchanged — callers treat it as a no-op.
    pub fn encrypt_text(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("text encryption failed: {}", e))?;

        Ok(format!("{}:{}", hex::encode(nonce_bytes), hex::encode(ciphertext)))
    }

    /// Decrypt a text token. Anything that does not parse and decrypt as a
    /// token of ours comes back as `Fallback` with the input untouched.
    pub fn decrypt_text(&self, token: &str) -> TextPayload {
        match self.try_decrypt_text(token) {
            Some(plaintext) => TextPayload::Plain(plaintext),
            None => TextPayload::Fallback(token.to_string()),
        }
    }

    fn try_decrypt_text(&self, token: &str) -> Option<String> {
        let (nonce_hex, cipher_hex) = token.split_once(':')?;
        let nonce_bytes = hex::decode(nonce_hex).ok()?;
        if nonce_bytes.len() != NONCE_LEN {
            return None;
        }
        let ciphertext = hex::decode(cipher_hex).ok()?;

        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .ok()?;

        String::from_utf8(plaintext).ok()
    }

    /// Seal a binary blob: nonce prepended to the ciphertext, one buffer,
    /// written to storage as-is.
    pub fn seal_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, data)
            .map_err(|e| anyhow!("blob encryption failed: {}", e))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a sealed blob. Unlike text, corruption here is a hard error the
    /// caller surfaces as a retrieval failure.
    pub fn open_bytes(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() <= NONCE_LEN {
            bail!("sealed blob too short: {} bytes", sealed.len());
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);

        self.cipher()
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow!("blob decryption failed: {}", e))
    }
}
