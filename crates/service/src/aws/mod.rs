//! AWS KMS-backed key-wrap provider.
//!
//! Credentials and region come from the standard AWS SDK chain; the KMS key
//! id, ARN or alias is the `DataEncryptionKeyId` of each request.

pub mod kms;

pub use kms::KmsEncryptor;
