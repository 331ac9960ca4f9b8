use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::error;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::{authorize, inspect};
use crate::uploads::PDF_CONTENT_TYPE;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    download: Option<String>,
}

fn not_found() -> AppError { AppError::not_found("not_found", "Not found") }

/// Last path segment of the blob URL, stripped of query and quotes.
fn download_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default().replace('"', "");
    if name.is_empty() { "file.pdf".to_string() } else { name }
}

/// `GET /api/files/{id}`: unpublished posts are only visible with the admin claim;
/// everyone else gets the same 404 as for a missing post.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<FileQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let post = state.posts.get_post(&id).await?.ok_or_else(not_found)?;
    let token = inspect(&state.codec, &state.cookies, &headers);
    if !post.published && authorize(&token).is_none() {
        return Err(not_found());
    }

    let bytes = state.blobs.fetch(&post.pdf_path).await.map_err(|e| {
        error!(target: "uploads", "blob fetch failed for post {}: {}", post.id, e);
        AppError::external("storage_unavailable", "The file could not be loaded.")
    })?;

    let mode = if q.download.as_deref() == Some("1") { "attachment" } else { "inline" };
    let disposition = HeaderValue::from_str(&format!("{}; filename=\"{}\"", mode, download_name(&post.pdf_path)))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));
    let mut out = HeaderMap::new();
    out.insert(CONTENT_TYPE, HeaderValue::from_static(PDF_CONTENT_TYPE));
    out.insert(CONTENT_DISPOSITION, disposition);
    out.insert(CACHE_CONTROL, HeaderValue::from_static("private, max-age=0"));
    Ok((StatusCode::OK, out, bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_name_from_url() {
        assert_eq!(download_name("/blobs/sv/flyer-abc.pdf"), "flyer-abc.pdf");
        assert_eq!(download_name("https://x.public.blob.vercel-storage.com/sv/a.pdf?v=1"), "a.pdf");
        assert_eq!(download_name(""), "file.pdf");
    }
}
