//! Deterministic key-wrap stubs shared by the crate's tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::encryptor::{Encryptor, KeyWrapError};

pub const TEST_KEY_ID: &str = "dek-test";
pub const TEST_ALGORITHM: &str = "XOR_TEST";

const MARK: &[u8] = b"xor:";

/// Reversible XOR transform that only knows a single key id.
#[derive(Debug)]
pub struct XorEncryptor {
    key_id: String,
    mask: u8,
    pub encrypt_calls: AtomicUsize,
    pub decrypt_calls: AtomicUsize,
    /// Delay applied to plaintexts longer than this many bytes.
    slow_above: Option<usize>,
}

impl XorEncryptor {
    pub fn new() -> Self {
        Self::with_key(TEST_KEY_ID)
    }

    pub fn with_key(key_id: &str) -> Self {
        Self {
            key_id: key_id.to_owned(),
            mask: key_id.bytes().fold(0x5A, |acc, b| acc ^ b),
            encrypt_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
            slow_above: None,
        }
    }

    /// Make encryption of large plaintexts finish later than small ones.
    pub fn slow_above(mut self, len: usize) -> Self {
        self.slow_above = Some(len);
        self
    }

    pub fn encrypt_count(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_count(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    fn check_key(&self, key_id: &str) -> Result<(), KeyWrapError> {
        if key_id == self.key_id {
            Ok(())
        } else {
            Err(KeyWrapError::UnknownKey(key_id.to_owned()))
        }
    }

    fn xor(&self, bytes: &[u8]) -> Vec<u8> {
        bytes.iter().map(|b| b ^ self.mask).collect()
    }
}

#[async_trait]
impl Encryptor for XorEncryptor {
    async fn encrypt(
        &self,
        plaintext: &[u8],
        key_id: &str,
        _algorithm: &str,
    ) -> Result<Vec<u8>, KeyWrapError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.check_key(key_id)?;
        if self.slow_above.is_some_and(|len| plaintext.len() > len) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let mut out = MARK.to_vec();
        out.extend(self.xor(plaintext));
        Ok(out)
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        key_id: &str,
        _algorithm: &str,
    ) -> Result<Vec<u8>, KeyWrapError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.check_key(key_id)?;
        let body = ciphertext
            .strip_prefix(MARK)
            .ok_or_else(|| KeyWrapError::Crypto("missing stub marker".into()))?;
        Ok(self.xor(body))
    }
}

/// Provider whose calls never complete.
#[derive(Debug, Default)]
pub struct StalledEncryptor;

#[async_trait]
impl Encryptor for StalledEncryptor {
    async fn encrypt(&self, _: &[u8], _: &str, _: &str) -> Result<Vec<u8>, KeyWrapError> {
        std::future::pending().await
    }

    async fn decrypt(&self, _: &[u8], _: &str, _: &str) -> Result<Vec<u8>, KeyWrapError> {
        std::future::pending().await
    }
}
