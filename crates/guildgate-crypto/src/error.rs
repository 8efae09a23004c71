//! Crypto error types.

/// Errors from token sealing.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Sealing failed: {0}")]
    SealFailed(String),

    #[error("Opening failed: {0}")]
    OpenFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Empty key material")]
    EmptyKey,

    #[error("Malformed sealed value: {0}")]
    Malformed(String),
}
