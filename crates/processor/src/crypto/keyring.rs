//! [`DekRing`]: in-memory data encryption keys, addressed by key id.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::cipher::{self, CipherError, SealedBytes, KEY_LEN};
use crate::encryptor::{Encryptor, KeyWrapError};

/// Algorithm id served by [`DekRing`].
pub const AES_256_GCM_SIV: &str = "AEAD_AES_256_GCM_SIV";

/// Errors produced when loading keys into the ring.
#[derive(Debug, Error)]
pub enum DekError {
    /// The key material has an unexpected length.
    #[error("DEK '{id}' has invalid length: expected {KEY_LEN} bytes, got {len}")]
    InvalidLength { id: String, len: usize },
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
#[derive(Clone)]
pub struct DekBytes(Box<[u8; KEY_LEN]>);

impl DekBytes {
    fn from_slice(id: &str, key_bytes: &[u8]) -> Result<Self, DekError> {
        if key_bytes.len() != KEY_LEN {
            return Err(DekError::InvalidLength {
                id: id.to_owned(),
                len: key_bytes.len(),
            });
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(key_bytes);
        Ok(Self(buf))
    }
}

impl Drop for DekBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for DekBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("DekBytes([REDACTED])")
    }
}

/// Shared, lock-free set of DEKs serving the [`AES_256_GCM_SIV`] algorithm.
///
/// Backed by [`ArcSwap`] so encrypt/decrypt calls never block; inserting a key
/// swaps in a new map.
#[derive(Clone, Debug, Default)]
pub struct DekRing {
    inner: Arc<ArcSwap<HashMap<String, DekBytes>>>,
}

impl DekRing {
    /// Create a new, empty [`DekRing`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently loaded.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Return `true` if no keys are loaded.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Whether a key with this id is loaded.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.load().contains_key(id)
    }

    /// Insert or replace the key `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DekError::InvalidLength`] if `key_bytes` is not [`KEY_LEN`] bytes.
    pub fn insert(&self, id: impl Into<String>, key_bytes: &[u8]) -> Result<(), DekError> {
        let id = id.into();
        let key = DekBytes::from_slice(&id, key_bytes)?;
        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(id.clone(), key.clone());
            next
        });
        debug!(key_id = %id, "DEK loaded");
        Ok(())
    }

    /// Atomically replace every key in the ring.
    ///
    /// # Errors
    ///
    /// Returns [`DekError::InvalidLength`] for the first malformed key; the
    /// ring is left unchanged in that case.
    pub fn replace_all<I, K, V>(&self, keys: I) -> Result<(), DekError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<[u8]>,
    {
        let next = keys
            .into_iter()
            .map(|(id, bytes)| {
                let id = id.into();
                DekBytes::from_slice(&id, bytes.as_ref()).map(|k| (id, k))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        self.inner.store(Arc::new(next));
        Ok(())
    }

    fn key(&self, id: &str, algorithm: &str) -> Result<DekBytes, KeyWrapError> {
        if algorithm != AES_256_GCM_SIV {
            return Err(KeyWrapError::UnsupportedAlgorithm(algorithm.to_owned()));
        }
        self.inner
            .load()
            .get(id)
            .cloned()
            .ok_or_else(|| KeyWrapError::UnknownKey(id.to_owned()))
    }
}

impl From<CipherError> for KeyWrapError {
    fn from(e: CipherError) -> Self {
        KeyWrapError::Crypto(e.to_string())
    }
}

#[async_trait]
impl Encryptor for DekRing {
    async fn encrypt(
        &self,
        plaintext: &[u8],
        key_id: &str,
        algorithm: &str,
    ) -> Result<Vec<u8>, KeyWrapError> {
        let dek = self.key(key_id, algorithm)?;
        Ok(cipher::seal(plaintext, &dek.0[..])?.to_bytes())
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        key_id: &str,
        algorithm: &str,
    ) -> Result<Vec<u8>, KeyWrapError> {
        let dek = self.key(key_id, algorithm)?;
        let sealed = SealedBytes::from_bytes(ciphertext)?;
        Ok(cipher::open(&sealed, &dek.0[..])?)
    }

    async fn is_ready(&self) -> bool {
        !self.is_empty()
    }
}
