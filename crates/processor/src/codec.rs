//! Type-preserving byte encoding of individual field values.
//!
//! Each encoded value carries a one-byte [`TypeMarker`] so that decryption
//! restores the exact JSON type that was encrypted.
//!
//! | marker  | byte | plaintext bytes                   |
//! |---------|------|-----------------------------------|
//! | String  | 2    | UTF-8                             |
//! | Double  | 3    | IEEE-754 `f64`, little-endian     |
//! | Long    | 4    | `i64`, little-endian              |
//! | Boolean | 5    | `0x00` / `0x01`                   |
//! | Array   | 6    | compact JSON text                 |
//! | Object  | 7    | compact JSON text                 |

use serde_json::{Number, Value};

use crate::error::{ProcessorError, ProcessorResult};

const NUMERIC_LEN: usize = 8;

/// Original JSON type of an encrypted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeMarker {
    Null = 1,
    String = 2,
    Double = 3,
    Long = 4,
    Boolean = 5,
    Array = 6,
    Object = 7,
}

impl TryFrom<u8> for TypeMarker {
    type Error = ProcessorError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            1 => TypeMarker::Null,
            2 => TypeMarker::String,
            3 => TypeMarker::Double,
            4 => TypeMarker::Long,
            5 => TypeMarker::Boolean,
            6 => TypeMarker::Array,
            7 => TypeMarker::Object,
            other => {
                return Err(ProcessorError::MalformedEnvelope(format!(
                    "unknown type marker {other}"
                )))
            }
        })
    }
}

/// Plaintext bytes of a field together with their type marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedField {
    pub marker: TypeMarker,
    pub bytes: Vec<u8>,
}

/// Encode a field value.
///
/// Returns `Ok(None)` for `null`: null fields are never encrypted.
///
/// # Errors
///
/// Returns [`ProcessorError::UnsupportedValue`] for unsigned integers above
/// `i64::MAX`, which have no lossless encoding.
pub fn encode(value: &Value) -> ProcessorResult<Option<EncodedField>> {
    let (marker, bytes) = match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => (TypeMarker::Boolean, vec![u8::from(*b)]),
        Value::String(s) => (TypeMarker::String, s.as_bytes().to_vec()),
        Value::Number(n) => encode_number(n)?,
        Value::Array(_) => (TypeMarker::Array, compact_json(value)?),
        Value::Object(_) => (TypeMarker::Object, compact_json(value)?),
    };
    Ok(Some(EncodedField { marker, bytes }))
}

fn encode_number(n: &Number) -> ProcessorResult<(TypeMarker, Vec<u8>)> {
    if let Some(i) = n.as_i64() {
        return Ok((TypeMarker::Long, i.to_le_bytes().to_vec()));
    }
    if n.is_u64() {
        return Err(ProcessorError::UnsupportedValue(
            "integer exceeds the signed 64-bit range".into(),
        ));
    }
    let f = n
        .as_f64()
        .ok_or_else(|| ProcessorError::UnsupportedValue("number is not representable".into()))?;
    Ok((TypeMarker::Double, f.to_le_bytes().to_vec()))
}

fn compact_json(value: &Value) -> ProcessorResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ProcessorError::UnsupportedValue(e.to_string()))
}

/// Decode plaintext bytes back into a typed value.
///
/// # Errors
///
/// Returns [`ProcessorError::MalformedEnvelope`] when the bytes do not form a
/// valid value of the type named by `marker`.
pub fn decode(marker: TypeMarker, bytes: &[u8]) -> ProcessorResult<Value> {
    match marker {
        TypeMarker::Null => Ok(Value::Null),
        TypeMarker::String => std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_owned()))
            .map_err(|_| malformed("string field is not valid UTF-8")),
        TypeMarker::Long => Ok(Value::from(i64::from_le_bytes(fixed_width(bytes)?))),
        TypeMarker::Double => {
            let f = f64::from_le_bytes(fixed_width(bytes)?);
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| malformed("double field is not a finite number"))
        }
        TypeMarker::Boolean => match bytes {
            [0] => Ok(Value::Bool(false)),
            [1] => Ok(Value::Bool(true)),
            _ => Err(malformed("boolean field must be a single 0 or 1 byte")),
        },
        TypeMarker::Array => match parse_json(bytes)? {
            v @ Value::Array(_) => Ok(v),
            _ => Err(malformed("array field does not contain a JSON array")),
        },
        TypeMarker::Object => match parse_json(bytes)? {
            v @ Value::Object(_) => Ok(v),
            _ => Err(malformed("object field does not contain a JSON object")),
        },
    }
}

fn fixed_width(bytes: &[u8]) -> ProcessorResult<[u8; NUMERIC_LEN]> {
    bytes.try_into().map_err(|_| {
        malformed(&format!(
            "numeric field must be {NUMERIC_LEN} bytes, got {}",
            bytes.len()
        ))
    })
}

fn parse_json(bytes: &[u8]) -> ProcessorResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| malformed(&format!("embedded JSON is invalid: {e}")))
}

fn malformed(msg: &str) -> ProcessorError {
    ProcessorError::MalformedEnvelope(msg.to_owned())
}
