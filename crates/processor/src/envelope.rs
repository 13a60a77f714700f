//! The encryption envelope embedded in every encrypted document.
//!
//! # Wire format
//!
//! ```text
//! "_ei": {
//!   "DataEncryptionKeyId": "dek-1",
//!   "EncryptionAlgorithm": "AEAD_AES_256_GCM_SIV",
//!   "EncryptionFormatVersion": 3,
//!   "EncryptedData": null,
//!   "EncryptedPaths": ["/SensitiveStr", "/SensitiveInt"]
//! }
//! ```
//!
//! `EncryptionAlgorithm` is required: decryption has no other source for it,
//! so an envelope carrying only key id, version, data and paths is rejected
//! as malformed.
//!
//! Each encrypted field slot holds `base64(type_marker || ciphertext)`.

use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::{EncodedField, TypeMarker};
use crate::error::{ProcessorError, ProcessorResult};
use crate::path::property_name;

/// Reserved top-level property holding the envelope.
pub const ENVELOPE_PROPERTY: &str = "_ei";

/// The only format version this crate writes and reads.
pub const FORMAT_VERSION: u32 = 3;

/// Metadata describing how a document was encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionProperties {
    pub data_encryption_key_id: String,
    pub encryption_algorithm: String,
    pub encryption_format_version: u32,
    /// Whole-document ciphertext. Always `None` in format version 3.
    pub encrypted_data: Option<Vec<u8>>,
    /// Paths that were actually encrypted, in the configured order.
    pub encrypted_paths: Vec<String>,
}

impl EncryptionProperties {
    pub fn new(
        data_encryption_key_id: impl Into<String>,
        encryption_algorithm: impl Into<String>,
        encrypted_paths: Vec<String>,
    ) -> Self {
        Self {
            data_encryption_key_id: data_encryption_key_id.into(),
            encryption_algorithm: encryption_algorithm.into(),
            encryption_format_version: FORMAT_VERSION,
            encrypted_data: None,
            encrypted_paths,
        }
    }

    /// Serialise into the JSON value stored under [`ENVELOPE_PROPERTY`].
    pub fn to_value(&self) -> ProcessorResult<Value> {
        serde_json::to_value(self)
            .map_err(|e| ProcessorError::MalformedEnvelope(format!("cannot serialise envelope: {e}")))
    }

    /// Parse and validate an envelope read from a document.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::MalformedEnvelope`] when the value has the
    /// wrong shape, an unsupported version, whole-document ciphertext, or a
    /// repeated path.
    pub fn from_value(value: Value) -> ProcessorResult<Self> {
        let props: Self = serde_json::from_value(value)
            .map_err(|e| ProcessorError::MalformedEnvelope(e.to_string()))?;

        if props.encryption_format_version != FORMAT_VERSION {
            return Err(ProcessorError::MalformedEnvelope(format!(
                "unsupported EncryptionFormatVersion {} (expected {FORMAT_VERSION})",
                props.encryption_format_version
            )));
        }
        if props.encrypted_data.is_some() {
            return Err(ProcessorError::MalformedEnvelope(
                "EncryptedData must be null in format version 3".into(),
            ));
        }
        if let Some(reserved) = props
            .encrypted_paths
            .iter()
            .find(|p| property_name(p) == ENVELOPE_PROPERTY)
        {
            return Err(ProcessorError::MalformedEnvelope(format!(
                "EncryptedPaths names the reserved property '{reserved}'"
            )));
        }
        let mut seen = HashSet::with_capacity(props.encrypted_paths.len());
        if let Some(dup) = props
            .encrypted_paths
            .iter()
            .find(|p| !seen.insert(property_name(p)))
        {
            return Err(ProcessorError::MalformedEnvelope(format!(
                "EncryptedPaths lists '{dup}' more than once"
            )));
        }
        Ok(props)
    }
}

/// Parse the envelope of a document root, if present. The root is not modified.
pub fn read(root: &Map<String, Value>) -> ProcessorResult<Option<EncryptionProperties>> {
    root.get(ENVELOPE_PROPERTY)
        .cloned()
        .map(EncryptionProperties::from_value)
        .transpose()
}

/// Build the string stored in an encrypted field slot.
///
/// The marker byte is outside the provider's ciphertext and is not
/// authenticated; a tampered marker is only caught if the plaintext fails to
/// decode under the new type.
pub fn seal_slot(marker: TypeMarker, ciphertext: &[u8]) -> Value {
    let mut buf = Vec::with_capacity(1 + ciphertext.len());
    buf.push(marker as u8);
    buf.extend_from_slice(ciphertext);
    Value::String(STANDARD.encode(buf))
}

/// Split an encrypted field slot into its marker and ciphertext.
///
/// The returned [`EncodedField`] holds ciphertext, not plaintext.
pub fn open_slot(path: &str, slot: &Value) -> ProcessorResult<EncodedField> {
    let text = slot.as_str().ok_or_else(|| {
        ProcessorError::MalformedEnvelope(format!("encrypted path '{path}' does not hold a string"))
    })?;
    let raw = STANDARD.decode(text).map_err(|_| {
        ProcessorError::MalformedEnvelope(format!("encrypted path '{path}' is not valid base64"))
    })?;
    let (&marker, ciphertext) = raw.split_first().ok_or_else(|| {
        ProcessorError::MalformedEnvelope(format!("encrypted path '{path}' is empty"))
    })?;
    Ok(EncodedField {
        marker: TypeMarker::try_from(marker)?,
        bytes: ciphertext.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_envelope_uses_current_format() {
        let p = EncryptionProperties::new("dek", "alg", vec!["/a".into()]);
        assert_eq!(p.encryption_format_version, 3);
        assert!(p.encrypted_data.is_none());
    }

    #[test]
    fn wire_names_are_stable() {
        let v = EncryptionProperties::new("dek", "alg", vec!["/a".into(), "/b".into()])
            .to_value()
            .unwrap();
        assert_eq!(
            v,
            json!({
                "DataEncryptionKeyId": "dek",
                "EncryptionAlgorithm": "alg",
                "EncryptionFormatVersion": 3,
                "EncryptedData": null,
                "EncryptedPaths": ["/a", "/b"]
            })
        );
    }

    #[test]
    fn rejects_other_versions() {
        let mut v = EncryptionProperties::new("dek", "alg", vec![]).to_value().unwrap();
        v["EncryptionFormatVersion"] = json!(2);
        assert!(matches!(
            EncryptionProperties::from_value(v),
            Err(ProcessorError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn rejects_encrypted_data() {
        let mut v = EncryptionProperties::new("dek", "alg", vec![]).to_value().unwrap();
        v["EncryptedData"] = json!([1, 2, 3]);
        assert!(EncryptionProperties::from_value(v).is_err());
    }

    #[test]
    fn rejects_wrong_shape_and_duplicates() {
        assert!(EncryptionProperties::from_value(json!("nope")).is_err());
        assert!(EncryptionProperties::from_value(json!({"DataEncryptionKeyId": "x"})).is_err());
        let v = EncryptionProperties::new("dek", "alg", vec!["/a".into(), "/a".into()])
            .to_value()
            .unwrap();
        assert!(EncryptionProperties::from_value(v).is_err());
    }

    #[test]
    fn rejects_same_property_under_two_spellings() {
        let v = EncryptionProperties::new("dek", "alg", vec!["/a".into(), "a".into()])
            .to_value()
            .unwrap();
        let err = EncryptionProperties::from_value(v).unwrap_err();
        assert!(matches!(err, ProcessorError::MalformedEnvelope(ref m) if m.contains("'a'")));
    }

    #[test]
    fn algorithm_is_required() {
        let v = json!({
            "DataEncryptionKeyId": "dek",
            "EncryptionFormatVersion": 3,
            "EncryptedData": null,
            "EncryptedPaths": ["/a"]
        });
        let err = EncryptionProperties::from_value(v).unwrap_err();
        assert!(
            matches!(err, ProcessorError::MalformedEnvelope(ref m) if m.contains("EncryptionAlgorithm"))
        );
    }

    #[test]
    fn rejects_reserved_path() {
        let v = EncryptionProperties::new("dek", "alg", vec!["/_ei".into()])
            .to_value()
            .unwrap();
        assert!(EncryptionProperties::from_value(v).is_err());
    }

    #[test]
    fn read_leaves_document_untouched() {
        let env = EncryptionProperties::new("dek", "alg", vec![]).to_value().unwrap();
        let mut root = Map::new();
        root.insert("id".into(), json!("1"));
        assert!(read(&root).unwrap().is_none());

        root.insert(ENVELOPE_PROPERTY.into(), env);
        let props = read(&root).unwrap().expect("envelope present");
        assert_eq!(props.data_encryption_key_id, "dek");
        assert!(root.contains_key(ENVELOPE_PROPERTY));
    }

    #[test]
    fn slot_round_trip() {
        let slot = seal_slot(TypeMarker::Long, &[9, 8, 7]);
        let field = open_slot("/x", &slot).unwrap();
        assert_eq!(field.marker, TypeMarker::Long);
        assert_eq!(field.bytes, vec![9, 8, 7]);
    }

    #[test]
    fn open_slot_rejects_garbage() {
        assert!(open_slot("/x", &json!(5)).is_err());
        assert!(open_slot("/x", &json!("!!!")).is_err());
        assert!(open_slot("/x", &json!("")).is_err());
        assert!(open_slot("/x", &json!(STANDARD.encode([0xEE, 1]))).is_err());
    }
}
