//! Error types for the encryption processor.

use thiserror::Error;

use crate::encryptor::KeyWrapError;

/// Errors produced by encrypt and decrypt operations.
///
/// Every variant is fatal for the call that produced it: no partially
/// transformed document is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// A configured path does not exist in the document, or may not be encrypted.
    ///
    /// The payload is the complete, caller-facing message.
    #[error("{0}")]
    InvalidPath(String),

    /// The encryption options are incomplete or inconsistent.
    #[error("invalid encryption options: {0}")]
    InvalidOptions(String),

    /// The input is not a JSON object, or cannot be encrypted in its current state.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The key-wrap provider could not resolve or use the data encryption key.
    #[error("failed to resolve data encryption key '{key_id}': {source}")]
    KeyResolution {
        /// Identifier of the key the provider was asked to use.
        key_id: String,
        /// Provider-level cause.
        #[source]
        source: KeyWrapError,
    },

    /// The embedded envelope, or a ciphertext it references, cannot be processed.
    #[error("malformed encryption envelope: {0}")]
    MalformedEnvelope(String),

    /// A field value has no lossless typed encoding.
    #[error("unsupported field value: {0}")]
    UnsupportedValue(String),

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Reading or rewinding the input stream failed.
    #[error("stream i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessorError {
    pub(crate) fn path_not_found(path: &str) -> Self {
        ProcessorError::InvalidPath(format!(
            "PathsToEncrypt includes a path: '{path}' which was not found."
        ))
    }

    pub(crate) fn key_resolution(key_id: &str, source: KeyWrapError) -> Self {
        ProcessorError::KeyResolution {
            key_id: key_id.to_owned(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type ProcessorResult<T> = Result<T, ProcessorError>;
