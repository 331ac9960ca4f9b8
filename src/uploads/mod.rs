//! PDF uploads: validation, file naming and delegation to a blob store.

use tracing::{error, warn};

mod blob;
mod validator;

pub use blob::{BlobStore, LocalBlobStore, SharedBlobs, VercelBlobStore};
pub use validator::{sanitize_filename, validate, UploadError, ValidatedPdf, MAX_UPLOAD_BYTES, PDF_CONTENT_TYPE};

/// A file as received from a multipart form, before any checks.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Blob pathname for a validated upload: `sv/<safe-name>-<uuid>.pdf`.
pub fn storage_pathname(original: &str) -> String {
    format!("sv/{}-{}.pdf", sanitize_filename(original), uuid::Uuid::new_v4())
}

/// Validate, then store. Storage failures collapse into the generic `UploadError::Storage`.
pub async fn store_pdf(blobs: &dyn BlobStore, file: Option<UploadedFile>) -> Result<String, UploadError> {
    let pdf = validate(file)?;
    let pathname = storage_pathname(&pdf.filename);
    blobs.put(&pathname, pdf.bytes, PDF_CONTENT_TYPE).await.map_err(|e| {
        error!(target: "uploads", "blob put failed for {}: {}", pathname, e);
        UploadError::Storage
    })
}

/// Best-effort removal; a missing blob is not an error for the caller.
pub async fn delete_pdf(blobs: &dyn BlobStore, url: Option<&str>) {
    let Some(url) = url.filter(|u| !u.is_empty()) else { return; };
    if let Err(e) = blobs.delete(url).await {
        warn!(target: "uploads", "blob delete ignored for {}: {}", url, e);
    }
}
