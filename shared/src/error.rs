use thiserror::Error;

/// Failures of the plain-text import/export format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Imported content is empty")]
    EmptyContent,
    #[error("No valid tasks found in imported content")]
    NoValidTasks,
    #[error("Task data is malformed: {0}")]
    Malformed(String),
}

/// Rejections raised before an import file is read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("File too large: maximum allowed is {}, file size is {}", mib(.max), kib(.size))]
    TooLarge { size: u64, max: u64 },
    #[error("Unsupported file type for '{name}' ({mime}): please choose a .txt text file")]
    WrongType { name: String, mime: String },
}

fn kib(bytes: &u64) -> String {
    format!("{:.2}KB", *bytes as f64 / 1024.0)
}

fn mib(bytes: &u64) -> String {
    format!("{}MB", *bytes / (1024 * 1024))
}
