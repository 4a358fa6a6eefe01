//! Encryption of provider credentials at rest.
//!
//! Ciphertexts are `base64(nonce (12 bytes) || ciphertext)` under
//! ChaCha20-Poly1305. Promotion copies them verbatim, so the same key must
//! decrypt rows in both environments.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use thiserror::Error;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Invalid credential key: {0}")]
    InvalidKey(String),

    #[error("Malformed ciphertext")]
    Malformed,

    #[error("Credential decryption failed")]
    Decrypt,

    #[error("Credential encryption failed")]
    Encrypt,
}

#[derive(Clone)]
pub struct CredentialCipher {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialCipher(..)")
    }
}

impl CredentialCipher {
    #[must_use]
    pub fn from_key_bytes(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Builds a cipher from a base64 encoded 32-byte key.
    ///
    /// # Errors
    /// Returns [`CipherError::InvalidKey`] if the value is not valid base64 or
    /// does not decode to exactly 32 bytes.
    pub fn from_base64_key(encoded: &str) -> Result<Self, CipherError> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;

        let key: [u8; KEY_LEN] = raw.as_slice().try_into().map_err(|_| {
            CipherError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", raw.len()))
        })?;

        Ok(Self::from_key_bytes(&key))
    }

    /// A new random key, base64 encoded, suitable for `security.credential_key`.
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut key);
        STANDARD.encode(key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let data = STANDARD.decode(encoded).map_err(|_| CipherError::Malformed)?;
        if data.len() <= NONCE_LEN {
            return Err(CipherError::Malformed);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Decrypt)
    }
}
