//! `guildgate` token sealing
//!
//! Captured OAuth tokens are never stored in clear text. Each token is sealed
//! with ChaCha20-Poly1305 under a key derived (HKDF-SHA256) from an
//! operator-supplied secret.
//!
//! Sealed format: `v1:` followed by hex of `nonce (12 bytes) || ciphertext+tag`.

pub mod error;
pub mod sealing;

pub use error::CryptoError;
pub use sealing::{NONCE_SIZE, SEALED_PREFIX, TokenCipher};
