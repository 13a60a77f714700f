//! The key-wrap capability consumed by the processor.
//!
//! The processor never touches key material. It hands encoded field bytes to
//! an [`Encryptor`] together with a key id and an algorithm id, and stores
//! whatever ciphertext comes back.

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by an [`Encryptor`] implementation.
#[derive(Debug, Error)]
pub enum KeyWrapError {
    /// No key with this id is known to the provider.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// The provider does not implement the requested algorithm.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The underlying cryptographic operation or remote call failed.
    #[error("key-wrap operation failed: {0}")]
    Crypto(String),
}

/// Encrypts and decrypts raw field bytes with a named data encryption key.
///
/// Implementations may suspend (for example on a remote KMS call). They must
/// be safe to call concurrently from many tasks.
#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext` with the key `key_id` using `algorithm`.
    async fn encrypt(
        &self,
        plaintext: &[u8],
        key_id: &str,
        algorithm: &str,
    ) -> Result<Vec<u8>, KeyWrapError>;

    /// Decrypt `ciphertext` previously produced by [`Encryptor::encrypt`].
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        key_id: &str,
        algorithm: &str,
    ) -> Result<Vec<u8>, KeyWrapError>;

    /// Whether the provider is able to serve requests right now.
    async fn is_ready(&self) -> bool {
        true
    }
}
