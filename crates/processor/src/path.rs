//! Resolution of `PathsToEncrypt` against a document.
//!
//! Only direct top-level properties are addressable. A path is matched by the
//! exact property name left after stripping one leading `/`, so `"/a/b"` names
//! a top-level property literally called `a/b`.

use serde_json::{Map, Value};

use crate::error::{ProcessorError, ProcessorResult};

/// A configured path paired with the property it addresses.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedPath<'a> {
    /// Position of the path in the caller's list.
    pub index: usize,
    /// The path exactly as configured.
    pub path: &'a str,
    /// Name of the top-level property.
    pub name: &'a str,
    /// Current value of the property.
    pub value: &'a Value,
}

/// Property name addressed by `path`.
pub fn property_name(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Resolve every path in `paths` against `document`, preserving order.
///
/// # Errors
///
/// Returns [`ProcessorError::InvalidPath`] for the first path that does not
/// name an existing property.
pub fn resolve<'a, P>(document: &'a Map<String, Value>, paths: P) -> ProcessorResult<Vec<ResolvedPath<'a>>>
where
    P: IntoIterator<Item = &'a String>,
{
    paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| {
            let name = property_name(path);
            document
                .get_key_value(name)
                .map(|(name, value)| ResolvedPath {
                    index,
                    path,
                    name,
                    value,
                })
                .ok_or_else(|| ProcessorError::path_not_found(path))
        })
        .collect()
}
