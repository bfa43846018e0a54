use std::path::Path;
use thiserror::Error;

/// Reasons an uploaded image is refused
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UploadValidationError {
    #[error("File size {size} bytes must be below {max_mb} MB")]
    TooLarge { size: u64, max_mb: u64 },

    #[error("File extension '{0}' is not allowed. Allowed: {1}")]
    InvalidExtension(String, String),

    #[error("MIME type '{0}' is not allowed. Allowed: {1}")]
    InvalidMimeType(String, String),

    #[error("File content does not match an allowed image type")]
    ContentMismatch,

    #[error("File appears to be empty")]
    Empty,
}

impl UploadValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "FILE_TOO_LARGE",
            Self::InvalidExtension(..) => "INVALID_EXTENSION",
            Self::InvalidMimeType(..) => "INVALID_MIME_TYPE",
            Self::ContentMismatch => "CONTENT_MISMATCH",
            Self::Empty => "EMPTY_FILE",
        }
    }
}

/// Lowercased extension of a filename, without the dot. Dotfiles such as
/// `.png` have no extension.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}

/// Accepts non-empty files strictly below `max_mb` megabytes.
pub fn validate_file_size(size: u64, max_mb: u64) -> Result<(), UploadValidationError> {
    if size == 0 {
        return Err(UploadValidationError::Empty);
    }
    if size >= max_mb.saturating_mul(1024 * 1024) {
        return Err(UploadValidationError::TooLarge { size, max_mb });
    }
    Ok(())
}

pub fn validate_extension(filename: &str, allowed: &[String]) -> Result<String, UploadValidationError> {
    let ext = file_extension(filename).unwrap_or_default();
    if allowed.iter().any(|a| *a == ext) {
        return Ok(ext);
    }
    Err(UploadValidationError::InvalidExtension(ext, allowed.join(", ")))
}

/// Checks the declared MIME subtype (`image/png` -> `png`) against the
/// allowed list. A missing content type is left to the magic-byte check.
pub fn validate_mime_type(
    content_type: Option<&str>,
    allowed: &[String],
) -> Result<(), UploadValidationError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };

    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    let accepted = normalized
        .parse::<mime::Mime>()
        .map(|m| m.type_() == mime::IMAGE && allowed.iter().any(|a| a == m.subtype().as_str()))
        .unwrap_or(false);

    if accepted {
        Ok(())
    } else {
        Err(UploadValidationError::InvalidMimeType(
            content_type.to_string(),
            allowed.join(", "),
        ))
    }
}

/// Sniffs the leading bytes; only PNG and JPEG payloads are accepted.
pub fn verify_image_magic(header: &[u8]) -> Result<&'static str, UploadValidationError> {
    if header.is_empty() {
        return Err(UploadValidationError::Empty);
    }
    match infer::get(header).map(|t| t.mime_type()) {
        Some(m @ ("image/png" | "image/jpeg")) => Ok(m),
        other => {
            tracing::warn!("Rejected upload, sniffed content type: {:?}", other);
            Err(UploadValidationError::ContentMismatch)
        }
    }
}
