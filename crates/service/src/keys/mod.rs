//! Key-wrap provider selection and local DEK loading.
//!
//! # Responsibilities
//!
//! - Build the [`Encryptor`] named by [`KeyProvider`].
//! - For the local provider, read the DEK file (YAML, falling back to JSON),
//!   decode each base64 key and seed a [`DekRing`].
//!
//! # Security invariants
//!
//! - Plaintext DEKs are never logged; only key ids and counts are.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use processor::{crypto::DekRing, Encryptor};
use tracing::{info, warn};

use crate::aws::KmsEncryptor;
use crate::config::{Config, KeyProvider};

/// Construct the key-wrap provider selected by configuration.
///
/// # Errors
///
/// Returns an error if the local DEK file cannot be read or parsed.
pub async fn build_encryptor(cfg: &Config) -> Result<Arc<dyn Encryptor>> {
    match cfg.key_provider {
        KeyProvider::Local => {
            let path = cfg
                .dek_file
                .as_deref()
                .context("DEK_FILE is required when KEY_PROVIDER=local")?;
            let ring = DekRing::new();
            load_dek_file(path, &ring).await?;
            Ok(Arc::new(ring))
        }
        KeyProvider::Kms => {
            info!("using AWS KMS key provider");
            Ok(Arc::new(KmsEncryptor::from_env().await))
        }
    }
}

/// Read a DEK file from disk and replace the contents of `ring`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is neither YAML nor JSON, or
/// contains a key that is not valid base64 of the right length.
pub async fn load_dek_file(path: &str, ring: &DekRing) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read DEK file {path}"))?;
    let count = load_deks(&text, ring).with_context(|| format!("invalid DEK file {path}"))?;
    info!(path = %path, count, "DEK file loaded");
    Ok(())
}

/// Parse `{key_id: base64_key}` and atomically replace the ring's keys.
///
/// Returns the number of keys loaded.
fn load_deks(text: &str, ring: &DekRing) -> Result<usize> {
    let encoded: BTreeMap<String, String> = if let Ok(parsed) = serde_yaml::from_str(text) {
        parsed
    } else if let Ok(parsed) = serde_json::from_str(text) {
        parsed
    } else {
        anyhow::bail!("not a valid YAML or JSON map of key id to base64 key");
    };

    if encoded.is_empty() {
        warn!("DEK file contains no keys");
    }

    let decoded = encoded
        .into_iter()
        .map(|(id, b64)| {
            STANDARD
                .decode(b64.trim())
                .map(|bytes| (id.clone(), bytes))
                .with_context(|| format!("DEK '{id}' is not valid base64"))
        })
        .collect::<Result<Vec<_>>>()?;

    let count = decoded.len();
    ring.replace_all(decoded)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use processor::crypto::KEY_LEN;

    fn b64_key(byte: u8) -> String {
        STANDARD.encode([byte; KEY_LEN])
    }

    #[test]
    fn loads_yaml() {
        let ring = DekRing::new();
        let text = format!("dek-1: {}\ndek-2: {}\n", b64_key(1), b64_key(2));
        assert_eq!(load_deks(&text, &ring).unwrap(), 2);
        assert!(ring.contains("dek-1"));
        assert!(ring.contains("dek-2"));
    }

    #[test]
    fn loads_json() {
        let ring = DekRing::new();
        let text = format!(r#"{{"dek-1": "{}"}}"#, b64_key(1));
        assert_eq!(load_deks(&text, &ring).unwrap(), 1);
    }

    #[test]
    fn rejects_bad_base64() {
        let ring = DekRing::new();
        let err = load_deks("dek-1: '!!!'", &ring).unwrap_err();
        assert!(err.to_string().contains("dek-1"));
        assert!(ring.is_empty());
    }

    #[test]
    fn rejects_short_key() {
        let ring = DekRing::new();
        let text = format!("dek-1: {}", STANDARD.encode([0u8; 16]));
        assert!(load_deks(&text, &ring).is_err());
    }

    #[test]
    fn rejects_non_map() {
        let ring = DekRing::new();
        assert!(load_deks("- a\n- b\n", &ring).is_err());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let ring = DekRing::new();
        assert!(load_dek_file("/nonexistent/deks.yaml", &ring).await.is_err());
    }
}
