//! Object key construction and validation.
//!
//! Keys follow `{folder}/{base_name}-{suffix}.{ext}`. Construction is pure so
//! the same product image always lands on the same three keys.

use thiserror::Error;
use vitrine_model::{ContentType, RenditionKind};

/// S3 caps keys at 1024 bytes.
pub const MAX_KEY_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("value is empty")]
    Empty,

    #[error("value is too long (max {MAX_KEY_LEN} bytes)")]
    TooLong,

    #[error("path traversal detected")]
    PathTraversal,

    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Build the storage key for one rendition.
pub fn object_key(
    folder: &str,
    base_name: &str,
    kind: RenditionKind,
    content_type: ContentType,
) -> String {
    format!(
        "{folder}/{base_name}-{}.{}",
        kind.suffix(),
        content_type.extension()
    )
}

fn check(value: &str, allow_slash: bool) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::Empty);
    }
    if value.len() > MAX_KEY_LEN {
        return Err(KeyError::TooLong);
    }
    if value.contains("..")
        || value.starts_with('/')
        || value.ends_with('/')
        || value.contains("//")
    {
        return Err(KeyError::PathTraversal);
    }
    if let Some(c) = value.chars().find(|&c| {
        !(c.is_ascii_alphanumeric()
            || matches!(c, '-' | '_' | '.')
            || (allow_slash && c == '/'))
    }) {
        return Err(KeyError::InvalidCharacter(c));
    }
    Ok(())
}

/// A full object key: nested paths allowed, nothing that escapes the root.
pub fn validate_key(key: &str) -> Result<(), KeyError> {
    check(key, true)
}

/// A folder may contain `/` separated segments.
pub fn validate_folder(folder: &str) -> Result<(), KeyError> {
    check(folder, true)
}

/// A base name is a single path segment.
pub fn validate_base_name(base_name: &str) -> Result<(), KeyError> {
    check(base_name, false)
}
