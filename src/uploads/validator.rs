use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::UploadedFile;

pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Rejection reasons, checked in declaration order. Each one is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("A PDF file is required.")]
    MissingFile,
    #[error("File too large (max. 25MB).")]
    TooLarge,
    #[error("Only PDF files are allowed.")]
    WrongDeclaredType,
    #[error("Invalid PDF file.")]
    InvalidSignature,
    /// The blob store failed after validation passed.
    #[error("Upload failed.")]
    Storage,
}

impl UploadError {
    pub fn code(&self) -> &'static str {
        match self {
            UploadError::MissingFile => "missing_file",
            UploadError::TooLarge => "too_large",
            UploadError::WrongDeclaredType => "wrong_declared_type",
            UploadError::InvalidSignature => "invalid_signature",
            UploadError::Storage => "upload_failed",
        }
    }
}

/// A file that passed every check; only these reach the blob store.
#[derive(Debug, Clone)]
pub struct ValidatedPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub fn validate(file: Option<UploadedFile>) -> Result<ValidatedPdf, UploadError> {
    let Some(file) = file.filter(|f| !f.bytes.is_empty()) else {
        return Err(UploadError::MissingFile);
    };
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge);
    }
    if file.content_type.as_deref() != Some(PDF_CONTENT_TYPE) {
        return Err(UploadError::WrongDeclaredType);
    }
    if !file.bytes.starts_with(PDF_MAGIC) {
        return Err(UploadError::InvalidSignature);
    }
    Ok(ValidatedPdf { filename: file.filename, bytes: file.bytes })
}

static EXTENSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[^/.]+$").expect("extension pattern"));
static UNSAFE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\-_]+").expect("unsafe chars pattern"));
static DASHES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("dash pattern"));

/// Storage-safe base name: extension stripped, lowercased, reduced to `[a-z0-9-_]`.
pub fn sanitize_filename(name: &str) -> String {
    let base = EXTENSION_RE.replace(name, "");
    let lower = base.to_lowercase();
    let safe = UNSAFE_RE.replace_all(&lower, "-");
    let collapsed = DASHES_RE.replace_all(&safe, "-");
    let trimmed = collapsed.trim_matches('-');
    if trimmed.is_empty() { "file".to_string() } else { trimmed.to_string() }
}
