//! Checks run on an import file before its content is read.

use crate::ValidationError;

/// Largest accepted import file, in bytes.
pub const MAX_IMPORT_BYTES: u64 = 1024 * 1024;

pub const TEXT_MIME_TYPE: &str = "text/plain";
pub const TEXT_EXTENSION: &str = ".txt";

/// What the UI layer knows about a picked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub mime: String,
    pub size: u64,
}

impl FileMeta {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size,
        }
    }
}

pub fn validate_file_size(meta: &FileMeta) -> Result<(), ValidationError> {
    if meta.size > MAX_IMPORT_BYTES {
        return Err(ValidationError::TooLarge {
            size: meta.size,
            max: MAX_IMPORT_BYTES,
        });
    }
    Ok(())
}

pub fn validate_file_type(meta: &FileMeta) -> Result<(), ValidationError> {
    if meta.mime == TEXT_MIME_TYPE || meta.name.ends_with(TEXT_EXTENSION) {
        return Ok(());
    }
    Err(ValidationError::WrongType {
        name: meta.name.clone(),
        mime: meta.mime.clone(),
    })
}

/// Size first, then type.
pub fn validate_file(meta: &FileMeta) -> Result<(), ValidationError> {
    validate_file_size(meta)?;
    validate_file_type(meta)
}
