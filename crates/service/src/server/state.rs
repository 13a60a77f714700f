//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use processor::{crypto::DekRing, Encryptor, EncryptionProcessor};

/// Application state shared across all request handlers.
///
/// Cloning is cheap: the processor holds its provider behind an `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Field-level encryption engine bound to the configured key provider.
    pub processor: EncryptionProcessor,
    /// Name of the key provider, reported by `GET /health`.
    pub provider: Arc<str>,
}

impl AppState {
    /// Create a new [`AppState`] around `encryptor`.
    pub fn new(encryptor: Arc<dyn Encryptor>, provider: &str) -> Self {
        Self {
            processor: EncryptionProcessor::new(encryptor),
            provider: Arc::from(provider),
        }
    }

    /// Whether the key provider can currently serve requests.
    pub async fn is_ready(&self) -> bool {
        self.processor.encryptor().is_ready().await
    }
}

impl Default for AppState {
    /// Creates an [`AppState`] over an empty local key ring, suitable for tests.
    fn default() -> Self {
        Self::new(Arc::new(DekRing::new()), "local")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_state_is_not_ready() {
        let state = AppState::default();
        assert!(!state.is_ready().await);
        assert_eq!(&*state.provider, "local");
    }

    #[tokio::test]
    async fn ready_once_a_key_is_loaded() {
        let ring = DekRing::new();
        ring.insert("dek-1", &[7u8; processor::crypto::KEY_LEN]).unwrap();
        let state = AppState::new(Arc::new(ring), "local");
        assert!(state.is_ready().await);
    }
}
