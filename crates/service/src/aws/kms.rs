//! [`KmsEncryptor`]: wraps field bytes with AWS KMS `Encrypt` / `Decrypt`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kms::{
    error::DisplayErrorContext,
    operation::{decrypt::DecryptError, encrypt::EncryptError},
    primitives::Blob,
    types::EncryptionAlgorithmSpec,
};
use processor::{Encryptor, KeyWrapError};
use tracing::warn;

/// Key-wrap provider backed by AWS KMS.
///
/// The algorithm id of each request is passed through as the KMS
/// `EncryptionAlgorithmSpec` (e.g. `SYMMETRIC_DEFAULT`).
#[derive(Clone, Debug)]
pub struct KmsEncryptor {
    client: aws_sdk_kms::Client,
}

impl KmsEncryptor {
    /// Build a client from the default AWS configuration chain.
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(aws_sdk_kms::Client::new(&config))
    }

    pub fn new(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Encryptor for KmsEncryptor {
    async fn encrypt(
        &self,
        plaintext: &[u8],
        key_id: &str,
        algorithm: &str,
    ) -> Result<Vec<u8>, KeyWrapError> {
        let resp = self
            .client
            .encrypt()
            .key_id(key_id)
            .plaintext(Blob::new(plaintext))
            .encryption_algorithm(EncryptionAlgorithmSpec::from(algorithm))
            .send()
            .await
            .map_err(|e| from_encrypt_error(key_id, e.into_service_error()))?;

        resp.ciphertext_blob()
            .map(|b| b.as_ref().to_vec())
            .ok_or_else(|| KeyWrapError::Crypto("KMS encrypt response contained no ciphertext".into()))
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        key_id: &str,
        algorithm: &str,
    ) -> Result<Vec<u8>, KeyWrapError> {
        let resp = self
            .client
            .decrypt()
            .key_id(key_id)
            .ciphertext_blob(Blob::new(ciphertext))
            .encryption_algorithm(EncryptionAlgorithmSpec::from(algorithm))
            .send()
            .await
            .map_err(|e| from_decrypt_error(key_id, e.into_service_error()))?;

        resp.plaintext()
            .map(|b| b.as_ref().to_vec())
            .ok_or_else(|| KeyWrapError::Crypto("KMS decrypt response contained no plaintext".into()))
    }
}

fn from_encrypt_error(key_id: &str, err: EncryptError) -> KeyWrapError {
    if err.is_not_found_exception() {
        return KeyWrapError::UnknownKey(key_id.to_owned());
    }
    warn!(key_id, error = %DisplayErrorContext(&err), "KMS encrypt failed");
    KeyWrapError::Crypto(format!("KMS encrypt failed: {err}"))
}

fn from_decrypt_error(key_id: &str, err: DecryptError) -> KeyWrapError {
    if err.is_not_found_exception() {
        return KeyWrapError::UnknownKey(key_id.to_owned());
    }
    if err.is_incorrect_key_exception() {
        return KeyWrapError::Crypto(format!("ciphertext was not produced by KMS key '{key_id}'"));
    }
    warn!(key_id, error = %DisplayErrorContext(&err), "KMS decrypt failed");
    KeyWrapError::Crypto(format!("KMS decrypt failed: {err}"))
}
