//! Selective field-level encryption of JSON documents.
//!
//! Given a document and [`EncryptionOptions`] naming the sensitive top-level
//! properties, [`EncryptionProcessor`] replaces just those properties with
//! ciphertext and records what it did in an envelope stored under the
//! reserved `_ei` property. Decryption reads the envelope and restores every
//! property with its original JSON type.
//!
//! # Module invariants
//!
//! - **No key management.** Keys are reached only through the [`Encryptor`]
//!   trait; [`crypto::DekRing`] is one in-memory implementation of it.
//! - **No partial output.** Every operation either completes or leaves its
//!   input untouched.
//! - **No plaintext in telemetry.** Field values and key material never appear
//!   in spans, events or error messages.

pub mod codec;
pub mod crypto;
pub mod diagnostics;
pub mod encryptor;
pub mod envelope;
pub mod error;
pub mod options;
pub mod path;
pub mod processor;
pub mod stream;

#[cfg(test)]
mod testing;

pub use diagnostics::DiagnosticsContext;
pub use encryptor::{Encryptor, KeyWrapError};
pub use envelope::{EncryptionProperties, ENVELOPE_PROPERTY, FORMAT_VERSION};
pub use error::{ProcessorError, ProcessorResult};
pub use options::EncryptionOptions;
pub use processor::EncryptionProcessor;
pub use stream::DocumentStream;
