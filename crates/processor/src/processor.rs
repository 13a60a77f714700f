//! [`EncryptionProcessor`]: encrypts and decrypts selected document properties.
//!
//! # Encrypt
//!
//! 1. Validate options, parse the document, resolve every path. Any failure
//!    aborts before the document is touched.
//! 2. Encode each non-null value, wrap the encoded bytes with the provider,
//!    and store `base64(marker || ciphertext)` in the property.
//! 3. Record the encrypted paths in the `_ei` envelope.
//!
//! # Decrypt
//!
//! Driven entirely by the envelope. Documents without one pass through
//! unchanged.
//!
//! Key-wrap calls for one document run concurrently; the document is only
//! mutated once all of them have succeeded, so an error or cancellation never
//! leaves a half-transformed tree behind.

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::codec::{self, TypeMarker};
use crate::diagnostics::{DiagnosticsContext, Operation};
use crate::encryptor::{Encryptor, KeyWrapError};
use crate::envelope::{self, EncryptionProperties, ENVELOPE_PROPERTY};
use crate::error::{ProcessorError, ProcessorResult};
use crate::options::EncryptionOptions;
use crate::path::{self, property_name};
use crate::stream::DocumentStream;

#[derive(Debug, Clone, Copy)]
enum Direction {
    Wrap,
    Unwrap,
}

/// A property scheduled for encryption.
struct PendingField {
    name: String,
    path: String,
    marker: TypeMarker,
    plaintext: Vec<u8>,
}

/// Selective field-level encryption over JSON documents.
///
/// Cheap to clone; share one instance across tasks.
#[derive(Clone)]
pub struct EncryptionProcessor {
    encryptor: Arc<dyn Encryptor>,
}

impl std::fmt::Debug for EncryptionProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionProcessor").finish_non_exhaustive()
    }
}

impl EncryptionProcessor {
    pub fn new(encryptor: Arc<dyn Encryptor>) -> Self {
        Self { encryptor }
    }

    /// The key-wrap provider used by this processor.
    pub fn encryptor(&self) -> &Arc<dyn Encryptor> {
        &self.encryptor
    }

    /// Encrypt the configured properties of a serialised document.
    ///
    /// Returns a new stream positioned at offset 0.
    ///
    /// # Errors
    ///
    /// See [`EncryptionProcessor::encrypt_document`]; additionally
    /// [`ProcessorError::InvalidDocument`] if `input` is not JSON.
    pub async fn encrypt(
        &self,
        input: &[u8],
        options: &EncryptionOptions,
        diagnostics: &mut DiagnosticsContext,
    ) -> ProcessorResult<Cursor<Vec<u8>>> {
        options.validate()?;
        let mut document = parse_document(input)?;
        self.encrypt_document(&mut document, options, diagnostics)
            .await?;
        serialize(&document)
    }

    /// Encrypt the configured properties of an already parsed document in place.
    ///
    /// # Errors
    ///
    /// - [`ProcessorError::InvalidOptions`] / [`ProcessorError::InvalidPath`] for bad options.
    /// - [`ProcessorError::InvalidDocument`] if the root is not an object or already
    ///   carries an envelope.
    /// - [`ProcessorError::UnsupportedValue`] for values with no lossless encoding.
    /// - [`ProcessorError::KeyResolution`] if the provider fails.
    ///
    /// On error `document` is left exactly as it was.
    #[instrument(
        skip_all,
        fields(
            key_id = %options.data_encryption_key_id,
            algorithm = %options.encryption_algorithm,
            paths = options.paths_to_encrypt.len(),
        )
    )]
    pub async fn encrypt_document(
        &self,
        document: &mut Value,
        options: &EncryptionOptions,
        diagnostics: &mut DiagnosticsContext,
    ) -> ProcessorResult<EncryptionProperties> {
        options.validate()?;
        let root = as_object_mut(document)?;
        if root.contains_key(ENVELOPE_PROPERTY) {
            return Err(ProcessorError::InvalidDocument(format!(
                "document already contains encryption metadata '{ENVELOPE_PROPERTY}'"
            )));
        }

        diagnostics.begin(Operation::EncryptContent);

        let pending = collect_pending(root, &options.paths_to_encrypt)?;
        let plaintexts = pending.iter().map(|f| f.plaintext.clone()).collect();
        let ciphertexts = self
            .key_wrap_all(
                plaintexts,
                &options.data_encryption_key_id,
                &options.encryption_algorithm,
                Direction::Wrap,
            )
            .await?;

        let mut encrypted_paths = Vec::with_capacity(pending.len());
        for (field, ciphertext) in pending.into_iter().zip(ciphertexts) {
            root.insert(field.name, envelope::seal_slot(field.marker, &ciphertext));
            encrypted_paths.push(field.path);
        }

        let props = EncryptionProperties::new(
            options.data_encryption_key_id.clone(),
            options.encryption_algorithm.clone(),
            encrypted_paths,
        );
        root.insert(ENVELOPE_PROPERTY.to_owned(), props.to_value()?);

        diagnostics.end(props.encrypted_paths.len());
        debug!(encrypted = props.encrypted_paths.len(), "document encrypted");
        Ok(props)
    }

    /// Decrypt a serialised document.
    ///
    /// The whole stream is read from offset 0. A document without an envelope
    /// is returned as [`DocumentStream::Passthrough`]: the caller's stream,
    /// rewound and otherwise untouched.
    ///
    /// # Errors
    ///
    /// See [`EncryptionProcessor::decrypt_document`]; additionally
    /// [`ProcessorError::Io`] on read/seek failure and
    /// [`ProcessorError::InvalidDocument`] if the content is not JSON.
    pub async fn decrypt<S>(
        &self,
        mut input: S,
        diagnostics: &mut DiagnosticsContext,
    ) -> ProcessorResult<DocumentStream<S>>
    where
        S: Read + Seek,
    {
        input.seek(SeekFrom::Start(0))?;
        let mut raw = Vec::new();
        input.read_to_end(&mut raw)?;

        let mut document = parse_document(&raw)?;
        match self.decrypt_document(&mut document, diagnostics).await? {
            None => {
                input.seek(SeekFrom::Start(0))?;
                Ok(DocumentStream::Passthrough(input))
            }
            Some(_) => Ok(DocumentStream::Rewritten(serialize(&document)?)),
        }
    }

    /// Decrypt a serialised document straight into a caller type.
    ///
    /// # Errors
    ///
    /// As [`EncryptionProcessor::decrypt_document`], plus
    /// [`ProcessorError::InvalidDocument`] when the plaintext does not
    /// deserialise into `T`.
    pub async fn decrypt_into<T: DeserializeOwned>(
        &self,
        input: &[u8],
        diagnostics: &mut DiagnosticsContext,
    ) -> ProcessorResult<T> {
        let mut document = parse_document(input)?;
        self.decrypt_document(&mut document, diagnostics).await?;
        serde_json::from_value(document).map_err(|e| {
            ProcessorError::InvalidDocument(format!("decrypted document does not match target type: {e}"))
        })
    }

    /// Decrypt a parsed document in place and strip its envelope.
    ///
    /// Returns the envelope that was removed, or `None` if the document was
    /// not encrypted (in which case it is not modified).
    ///
    /// # Errors
    ///
    /// - [`ProcessorError::InvalidDocument`] if the root is not an object.
    /// - [`ProcessorError::MalformedEnvelope`] for an unreadable envelope, a missing
    ///   or corrupt encrypted property, or plaintext that does not match its type marker.
    /// - [`ProcessorError::KeyResolution`] if the provider fails.
    ///
    /// On error `document` is left exactly as it was.
    #[instrument(skip_all, fields(key_id = tracing::field::Empty))]
    pub async fn decrypt_document(
        &self,
        document: &mut Value,
        diagnostics: &mut DiagnosticsContext,
    ) -> ProcessorResult<Option<EncryptionProperties>> {
        let root = as_object_mut(document)?;
        let Some(props) = envelope::read(root)? else {
            debug!("no encryption envelope; document passed through");
            return Ok(None);
        };
        tracing::Span::current().record("key_id", props.data_encryption_key_id.as_str());

        diagnostics.begin(Operation::DecryptContent);

        let mut markers = Vec::with_capacity(props.encrypted_paths.len());
        let mut ciphertexts = Vec::with_capacity(props.encrypted_paths.len());
        for path in &props.encrypted_paths {
            let slot = root.get(property_name(path)).ok_or_else(|| {
                ProcessorError::MalformedEnvelope(format!(
                    "encrypted path '{path}' is missing from the document"
                ))
            })?;
            let sealed = envelope::open_slot(path, slot)?;
            markers.push(sealed.marker);
            ciphertexts.push(sealed.bytes);
        }

        let plaintexts = self
            .key_wrap_all(
                ciphertexts,
                &props.data_encryption_key_id,
                &props.encryption_algorithm,
                Direction::Unwrap,
            )
            .await?;

        let restored = markers
            .into_iter()
            .zip(&plaintexts)
            .map(|(marker, bytes)| codec::decode(marker, bytes))
            .collect::<ProcessorResult<Vec<_>>>()?;

        for (path, value) in props.encrypted_paths.iter().zip(restored) {
            root.insert(property_name(path).to_owned(), value);
        }
        root.shift_remove(ENVELOPE_PROPERTY);

        diagnostics.end(props.encrypted_paths.len());
        debug!(decrypted = props.encrypted_paths.len(), "document decrypted");
        Ok(Some(props))
    }

    /// [`EncryptionProcessor::encrypt`], aborted with [`ProcessorError::Cancelled`]
    /// as soon as `cancel` fires.
    pub async fn encrypt_cancellable(
        &self,
        input: &[u8],
        options: &EncryptionOptions,
        diagnostics: &mut DiagnosticsContext,
        cancel: &CancellationToken,
    ) -> ProcessorResult<Cursor<Vec<u8>>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProcessorError::Cancelled),
            result = self.encrypt(input, options, diagnostics) => result,
        }
    }

    /// [`EncryptionProcessor::decrypt`], aborted with [`ProcessorError::Cancelled`]
    /// as soon as `cancel` fires.
    pub async fn decrypt_cancellable<S>(
        &self,
        input: S,
        diagnostics: &mut DiagnosticsContext,
        cancel: &CancellationToken,
    ) -> ProcessorResult<DocumentStream<S>>
    where
        S: Read + Seek,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProcessorError::Cancelled),
            result = self.decrypt(input, diagnostics) => result,
        }
    }

    /// Run one provider call per input concurrently; outputs keep input order.
    ///
    /// Dropping the returned future aborts every outstanding call.
    async fn key_wrap_all(
        &self,
        inputs: Vec<Vec<u8>>,
        key_id: &str,
        algorithm: &str,
        direction: Direction,
    ) -> ProcessorResult<Vec<Vec<u8>>> {
        let count = inputs.len();
        let shared_key: Arc<str> = Arc::from(key_id);
        let shared_alg: Arc<str> = Arc::from(algorithm);

        let mut tasks = JoinSet::new();
        for (slot, input) in inputs.into_iter().enumerate() {
            let encryptor = Arc::clone(&self.encryptor);
            let key_id = Arc::clone(&shared_key);
            let algorithm = Arc::clone(&shared_alg);
            tasks.spawn(async move {
                let output = match direction {
                    Direction::Wrap => encryptor.encrypt(&input, &key_id, &algorithm).await,
                    Direction::Unwrap => encryptor.decrypt(&input, &key_id, &algorithm).await,
                };
                (slot, output)
            });
        }

        let mut outputs: Vec<Option<Vec<u8>>> = vec![None; count];
        while let Some(joined) = tasks.join_next().await {
            let (slot, output) = joined.map_err(|e| {
                ProcessorError::key_resolution(
                    key_id,
                    KeyWrapError::Crypto(format!("key-wrap task did not complete: {e}")),
                )
            })?;
            outputs[slot] = Some(output.map_err(|e| ProcessorError::key_resolution(key_id, e))?);
        }

        outputs.into_iter().collect::<Option<Vec<_>>>().ok_or_else(|| {
            ProcessorError::key_resolution(
                key_id,
                KeyWrapError::Crypto("key-wrap produced no output".into()),
            )
        })
    }
}

/// Resolve and encode every non-null configured property, in configured order.
fn collect_pending(root: &Map<String, Value>, paths: &[String]) -> ProcessorResult<Vec<PendingField>> {
    let resolved = path::resolve(root, paths)?;
    let mut pending = Vec::with_capacity(resolved.len());
    for r in resolved {
        match codec::encode(r.value)? {
            Some(encoded) => pending.push(PendingField {
                name: r.name.to_owned(),
                path: r.path.to_owned(),
                marker: encoded.marker,
                plaintext: encoded.bytes,
            }),
            None => debug!(path = r.path, "null value left unencrypted"),
        }
    }
    Ok(pending)
}

fn parse_document(input: &[u8]) -> ProcessorResult<Value> {
    serde_json::from_slice(input)
        .map_err(|e| ProcessorError::InvalidDocument(format!("input is not valid JSON: {e}")))
}

fn as_object_mut(document: &mut Value) -> ProcessorResult<&mut Map<String, Value>> {
    document
        .as_object_mut()
        .ok_or_else(|| ProcessorError::InvalidDocument("document root must be a JSON object".into()))
}

fn serialize(document: &Value) -> ProcessorResult<Cursor<Vec<u8>>> {
    serde_json::to_vec(document)
        .map(Cursor::new)
        .map_err(|e| ProcessorError::InvalidDocument(format!("cannot serialise document: {e}")))
}
