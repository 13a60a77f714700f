//! AES-256-GCM-SIV encryption and decryption of raw field bytes.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant.
//! A fresh random nonce is still drawn for every call.
//!
//! **Do NOT substitute plain AES-256-GCM with a fixed nonce.** GCM nonce reuse
//! is catastrophic: it breaks both confidentiality and authentication.

use aes_gcm_siv::{
    aead::{Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the AES-GCM-SIV authentication tag.
pub const TAG_LEN: usize = 16;

/// A sealed field: nonce plus ciphertext and tag.
///
/// The binary representation is `nonce(12) || ciphertext+tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBytes {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl SealedBytes {
    /// Concatenate nonce and ciphertext.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split a buffer produced by [`SealedBytes::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] if the buffer is too short to
    /// hold a nonce and an authentication tag.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CipherError> {
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::InvalidFormat);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);
        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The DEK is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid DEK length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// AES-GCM-SIV encryption or decryption failed.
    #[error("aead operation failed")]
    AeadFailure,

    /// The sealed buffer is too short to be valid.
    #[error("invalid ciphertext format")]
    InvalidFormat,
}

/// Encrypt plaintext bytes using AES-256-GCM-SIV under a fresh random nonce.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `dek` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error.
pub fn seal(plaintext: &[u8], dek: &[u8]) -> Result<SealedBytes, CipherError> {
    let cipher = build_cipher(dek)?;

    use aes_gcm_siv::aead::rand_core::RngCore;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CipherError::AeadFailure)?;

    Ok(SealedBytes {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt [`SealedBytes`] back to plaintext.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `dek` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key or tampered data).
pub fn open(sealed: &SealedBytes, dek: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(dek)?;
    let nonce = Nonce::from_slice(&sealed.nonce);
    cipher
        .decrypt(nonce, sealed.ciphertext.as_ref())
        .map_err(|_| CipherError::AeadFailure)
}

fn build_cipher(dek: &[u8]) -> Result<Aes256GcmSiv, CipherError> {
    if dek.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256GcmSiv::new_from_slice(dek).map_err(|_| CipherError::InvalidKeyLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_dek() -> Vec<u8> {
        use aes_gcm_siv::aead::rand_core::RngCore;
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    #[test]
    fn seal_open_round_trip() {
        let dek = random_dek();
        let sealed = seal(b"123-45-6789", &dek).unwrap();
        assert_eq!(open(&sealed, &dek).unwrap(), b"123-45-6789");
    }

    #[test]
    fn fresh_nonce_per_call() {
        let dek = random_dek();
        let a = seal(b"same", &dek).unwrap();
        let b = seal(b"same", &dek).unwrap();
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(b"secret", &random_dek()).unwrap();
        assert!(matches!(open(&sealed, &random_dek()), Err(CipherError::AeadFailure)));
    }

    #[test]
    fn invalid_key_length_rejected() {
        assert!(matches!(seal(b"x", &[0u8; 16]), Err(CipherError::InvalidKeyLength)));
    }

    #[test]
    fn bytes_round_trip() {
        let dek = random_dek();
        let sealed = seal(b"hello", &dek).unwrap();
        let raw = sealed.to_bytes();
        assert_eq!(raw.len(), NONCE_LEN + 5 + TAG_LEN);
        let parsed = SealedBytes::from_bytes(&raw).unwrap();
        assert_eq!(parsed, sealed);
        assert_eq!(open(&parsed, &dek).unwrap(), b"hello");
    }

    #[test]
    fn short_buffer_rejected() {
        assert!(SealedBytes::from_bytes(&[0u8; NONCE_LEN + TAG_LEN - 1]).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let dek = random_dek();
        let mut sealed = seal(b"tamper me", &dek).unwrap();
        sealed.ciphertext[0] ^= 0xFF;
        assert!(open(&sealed, &dek).is_err());
    }
}
