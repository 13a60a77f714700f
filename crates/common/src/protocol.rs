//! Request and response types exchanged over the HTTP API.

use processor::EncryptionOptions;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Encrypt endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /encrypt`.
///
/// `payload` is an arbitrary JSON object; the top-level properties named in
/// `options.PathsToEncrypt` are replaced with ciphertext strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptRequest {
    /// Plaintext JSON object.
    pub payload: serde_json::Value,
    /// Key, algorithm and paths to encrypt.
    pub options: EncryptionOptions,
}

/// Successful response body for `POST /encrypt`.
///
/// Mirrors the input with the selected properties encrypted and the `_ei`
/// envelope appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptResponse {
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Decrypt endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptRequest {
    /// A document previously produced by `POST /encrypt`, or any plaintext object.
    pub payload: serde_json::Value,
}

/// Successful response body for `POST /decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    /// The restored document, without its `_ei` envelope.
    pub payload: serde_json::Value,
    /// Paths that were decrypted. Empty when the payload carried no envelope.
    #[serde(default)]
    pub decrypted_paths: Vec<String>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Name of the configured key provider (`"local"` or `"kms"`).
    pub provider: String,
    /// Whether the key provider can currently serve requests.
    pub ready: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encrypt_request_wire_format() {
        let req: EncryptRequest = serde_json::from_value(json!({
            "payload": {"ssn": "123-45-6789", "name": "Alice"},
            "options": {
                "DataEncryptionKeyId": "dek-1",
                "EncryptionAlgorithm": "AEAD_AES_256_GCM_SIV",
                "PathsToEncrypt": ["/ssn"]
            }
        }))
        .unwrap();
        assert_eq!(req.payload["ssn"], "123-45-6789");
        assert_eq!(req.options.paths_to_encrypt, vec!["/ssn".to_string()]);
    }

    #[test]
    fn decrypt_response_defaults_paths() {
        let resp: DecryptResponse = serde_json::from_value(json!({"payload": {}})).unwrap();
        assert!(resp.decrypted_paths.is_empty());
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("bad_request", "unknown key");
        assert_eq!(e.code, "bad_request");
        assert!(e.message.contains("unknown key"));
    }
}
