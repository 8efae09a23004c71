//! Token sealing with ChaCha20-Poly1305.
//!
//! Every `seal` call draws a fresh random nonce, so sealing the same token
//! twice yields different ciphertexts.

use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CryptoError;

/// HKDF info string for the sealing key.
const HKDF_INFO: &[u8] = b"guildgate-token-sealing-v1";

/// HKDF salt for domain separation (recommended by RFC 5869).
const HKDF_SALT: &[u8] = b"guildgate-token-hkdf-salt-v1";

/// Nonce size for ChaCha20-Poly1305.
pub const NONCE_SIZE: usize = 12;

/// Version prefix of every sealed value.
pub const SEALED_PREFIX: &str = "v1:";

/// Seals and opens token strings for storage.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: ChaCha20Poly1305,
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenCipher(<key>)")
    }
}

impl TokenCipher {
    /// Derive the sealing key from operator-supplied secret material.
    pub fn from_secret(secret: &[u8]) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret);
        let mut key_bytes = [0u8; 32];
        hk.expand(HKDF_INFO, &mut key_bytes)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key_bytes));
        key_bytes.zeroize();

        Ok(Self { cipher })
    }

    /// Seal a plaintext token into its storable form.
    pub fn seal(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| CryptoError::SealFailed(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(format!("{SEALED_PREFIX}{}", hex::encode(payload)))
    }

    /// Open a value produced by [`TokenCipher::seal`].
    pub fn open(&self, sealed: &str) -> Result<String, CryptoError> {
        let encoded = sealed
            .strip_prefix(SEALED_PREFIX)
            .ok_or_else(|| CryptoError::Malformed("missing version prefix".into()))?;
        let payload =
            hex::decode(encoded).map_err(|e| CryptoError::Malformed(e.to_string()))?;
        if payload.len() <= NONCE_SIZE {
            return Err(CryptoError::Malformed(format!(
                "payload too short: {} bytes",
                payload.len()
            )));
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
        let mut plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::OpenFailed(e.to_string()))?;

        let token = std::str::from_utf8(&plaintext)
            .map(str::to_owned)
            .map_err(|e| CryptoError::OpenFailed(e.to_string()));
        plaintext.zeroize();
        token
    }
}
