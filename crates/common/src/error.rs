//! Service-level error type and its mapping from processor errors.

use processor::{KeyWrapError, ProcessorError};
use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed: bad options, unknown path, unknown key, or invalid document.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Encryption or decryption failed in the key-wrap layer.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The key provider is not yet initialised or is temporarily unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// Message that is safe to return to callers.
    pub fn public_message(&self) -> &str {
        match self {
            ServiceError::BadRequest(m)
            | ServiceError::EncryptionFailure(m)
            | ServiceError::Unavailable(m)
            | ServiceError::Internal(m) => m,
        }
    }
}

impl From<ProcessorError> for ServiceError {
    fn from(e: ProcessorError) -> Self {
        match e {
            ProcessorError::InvalidPath(_)
            | ProcessorError::InvalidOptions(_)
            | ProcessorError::InvalidDocument(_)
            | ProcessorError::MalformedEnvelope(_)
            | ProcessorError::UnsupportedValue(_) => ServiceError::BadRequest(e.to_string()),
            ProcessorError::KeyResolution {
                source: KeyWrapError::UnknownKey(_) | KeyWrapError::UnsupportedAlgorithm(_),
                ..
            } => ServiceError::BadRequest(e.to_string()),
            ProcessorError::KeyResolution { .. } => ServiceError::EncryptionFailure(e.to_string()),
            ProcessorError::Cancelled => ServiceError::Unavailable(e.to_string()),
            ProcessorError::Io(_) => ServiceError::Internal(e.to_string()),
        }
    }
}
