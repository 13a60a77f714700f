//! Caller-supplied encryption policy.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::envelope::ENVELOPE_PROPERTY;
use crate::error::{ProcessorError, ProcessorResult};
use crate::path::property_name;

/// Which fields to encrypt, and with which key and algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionOptions {
    /// Identifier of the data encryption key handed to the [`crate::Encryptor`].
    pub data_encryption_key_id: String,
    /// Algorithm identifier handed to the [`crate::Encryptor`].
    pub encryption_algorithm: String,
    /// Top-level property paths (`/Name`) in the order they are processed.
    pub paths_to_encrypt: Vec<String>,
}

impl EncryptionOptions {
    /// Construct options from a key id, an algorithm id and a list of paths.
    pub fn new<I, S>(
        data_encryption_key_id: impl Into<String>,
        encryption_algorithm: impl Into<String>,
        paths_to_encrypt: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data_encryption_key_id: data_encryption_key_id.into(),
            encryption_algorithm: encryption_algorithm.into(),
            paths_to_encrypt: paths_to_encrypt.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the options before any document is touched.
    ///
    /// # Errors
    ///
    /// - [`ProcessorError::InvalidOptions`] for a blank key id or algorithm, or a
    ///   path listed twice.
    /// - [`ProcessorError::InvalidPath`] for a path naming the envelope property.
    pub fn validate(&self) -> ProcessorResult<()> {
        if self.data_encryption_key_id.trim().is_empty() {
            return Err(ProcessorError::InvalidOptions(
                "DataEncryptionKeyId is required and must not be empty".into(),
            ));
        }
        if self.encryption_algorithm.trim().is_empty() {
            return Err(ProcessorError::InvalidOptions(
                "EncryptionAlgorithm is required and must not be empty".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.paths_to_encrypt.len());
        for path in &self.paths_to_encrypt {
            if property_name(path) == ENVELOPE_PROPERTY {
                return Err(ProcessorError::InvalidPath(format!(
                    "PathsToEncrypt includes a path: '{path}' which is reserved for encryption metadata."
                )));
            }
            if !seen.insert(property_name(path)) {
                return Err(ProcessorError::InvalidOptions(format!(
                    "PathsToEncrypt includes the path '{path}' more than once"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(paths: &[&str]) -> EncryptionOptions {
        EncryptionOptions::new("dek-1", "AEAD_AES_256_GCM_SIV", paths.iter().copied())
    }

    #[test]
    fn valid_options_pass() {
        assert!(options(&["/SensitiveStr", "/SensitiveInt"]).validate().is_ok());
    }

    #[test]
    fn empty_path_list_is_allowed() {
        assert!(options(&[]).validate().is_ok());
    }

    #[test]
    fn blank_key_id_rejected() {
        let mut o = options(&["/a"]);
        o.data_encryption_key_id = "  ".into();
        assert!(matches!(o.validate(), Err(ProcessorError::InvalidOptions(_))));
    }

    #[test]
    fn blank_algorithm_rejected() {
        let mut o = options(&["/a"]);
        o.encryption_algorithm.clear();
        assert!(matches!(o.validate(), Err(ProcessorError::InvalidOptions(_))));
    }

    #[test]
    fn duplicate_path_rejected() {
        let err = options(&["/a", "/b", "/a"]).validate().unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidOptions(ref m) if m.contains("'/a'")));
    }

    #[test]
    fn same_property_spelled_twice_rejected() {
        let err = options(&["/a", "a"]).validate().unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidOptions(ref m) if m.contains("'a'")));
    }

    #[test]
    fn envelope_property_cannot_be_encrypted() {
        let err = options(&["/_ei"]).validate().unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidPath(ref m) if m.contains("'/_ei'")));
    }

    #[test]
    fn serde_uses_pascal_case() {
        let json = serde_json::to_value(options(&["/a"])).unwrap();
        assert_eq!(json["DataEncryptionKeyId"], "dek-1");
        assert_eq!(json["EncryptionAlgorithm"], "AEAD_AES_256_GCM_SIV");
        assert_eq!(json["PathsToEncrypt"][0], "/a");
    }
}
