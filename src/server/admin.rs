//! Admin handlers. Each one re-checks the session through `require_admin` even though the
//! guard middleware already ran, so a deleted admin loses access immediately.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Redirect;
use axum::{Form, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{AppState, PostView};
use crate::error::{AppError, AppResult};
use crate::identity::{require_admin, ADMIN_HOME};
use crate::security::{self, AdminInput};
use crate::storage::{new_id, Post, PostFields};
use crate::uploads::{delete_pdf, store_pdf, UploadError, UploadedFile};

const ADMINS_PAGE: &str = "/admin/admins";

/// Raw multipart submission of the post form.
#[derive(Debug, Default)]
pub struct PostSubmission {
    pub title: String,
    pub description: String,
    pub content: String,
    pub published: String,
    pub pinned: String,
    pub pdf: Option<UploadedFile>,
}

fn to_optional_text(value: &str) -> Option<String> {
    let t = value.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

fn to_bool(value: &str) -> bool {
    value == "on" || value == "true"
}

impl PostSubmission {
    pub fn fields(&self) -> AppResult<PostFields> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::user("invalid_post", "Please fill in all required fields correctly."));
        }
        Ok(PostFields {
            title: title.to_string(),
            description: to_optional_text(&self.description),
            content: to_optional_text(&self.content),
            published: to_bool(&self.published),
            pinned: to_bool(&self.pinned),
        })
    }

    /// The uploaded PDF, if the form carried a non-empty one.
    fn replacement_pdf(&mut self) -> Option<UploadedFile> {
        self.pdf.take().filter(|f| !f.bytes.is_empty())
    }
}

/// A body cut off by the request size limit is reported as an oversized upload.
fn bad_form(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::TooLarge.into();
    }
    AppError::UserInput { code: "invalid_form".into(), message: format!("Form could not be read: {}", e) }
}

pub async fn read_post_form(mut multipart: Multipart) -> AppResult<PostSubmission> {
    let mut sub = PostSubmission::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "pdf" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(|c| c.to_string());
            let bytes = field.bytes().await.map_err(bad_form)?.to_vec();
            sub.pdf = Some(UploadedFile { filename, content_type, bytes });
            continue;
        }
        let text = field.text().await.map_err(bad_form)?;
        match name.as_str() {
            "title" => sub.title = text,
            "description" => sub.description = text,
            "content" => sub.content = text,
            "published" => sub.published = text,
            "pinned" => sub.pinned = text,
            _ => {}
        }
    }
    Ok(sub)
}

pub async fn list_posts(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Vec<PostView>>> {
    require_admin(&state, &headers).await?;
    let posts = state.posts.list_posts().await?;
    Ok(Json(posts.into_iter().map(PostView::from).collect()))
}

pub async fn show_post(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> AppResult<Json<PostView>> {
    require_admin(&state, &headers).await?;
    let post = state.posts.get_post(&id).await?
        .ok_or_else(|| AppError::not_found("post_not_found", "Post not found."))?;
    Ok(Json(post.into()))
}

pub async fn create_post(State(state): State<AppState>, headers: HeaderMap, multipart: Multipart) -> AppResult<Redirect> {
    require_admin(&state, &headers).await?;
    let sub = read_post_form(multipart).await?;
    let fields = sub.fields()?;
    let pdf_path = store_pdf(state.blobs.as_ref(), sub.pdf).await?;
    let now = Utc::now();
    let post = Post {
        id: new_id(),
        title: fields.title,
        description: fields.description,
        content: fields.content,
        pdf_path,
        published: fields.published,
        pinned: fields.pinned,
        created_at: now,
        updated_at: now,
    };
    info!(target: "uploads", "post created id={} published={}", post.id, post.published);
    state.posts.insert_post(post).await?;
    Ok(Redirect::to(ADMIN_HOME))
}

/// A new PDF is stored before the old one is removed, so a failed upload leaves the post intact.
pub async fn update_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Redirect> {
    require_admin(&state, &headers).await?;
    let existing = state.posts.get_post(&id).await?
        .ok_or_else(|| AppError::not_found("post_not_found", "Post not found."))?;
    let mut sub = read_post_form(multipart).await?;
    let fields = sub.fields()?;

    let mut pdf_path = existing.pdf_path.clone();
    if let Some(file) = sub.replacement_pdf() {
        pdf_path = store_pdf(state.blobs.as_ref(), Some(file)).await?;
        delete_pdf(state.blobs.as_ref(), Some(&existing.pdf_path)).await;
    }

    if !state.posts.update_post(&id, fields, pdf_path).await? {
        return Err(AppError::not_found("post_not_found", "Post not found."));
    }
    Ok(Redirect::to(ADMIN_HOME))
}

pub async fn delete_post(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> AppResult<Redirect> {
    require_admin(&state, &headers).await?;
    if let Some(post) = state.posts.delete_post(&id).await? {
        delete_pdf(state.blobs.as_ref(), Some(&post.pdf_path)).await;
        info!(target: "uploads", "post deleted id={}", post.id);
    }
    Ok(Redirect::to(ADMIN_HOME))
}

#[derive(Debug, Serialize)]
pub struct AdminSummary {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

pub async fn list_admins(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Vec<AdminSummary>>> {
    require_admin(&state, &headers).await?;
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(|u| AdminSummary { id: u.id, email: u.email, created_at: u.created_at }).collect()))
}

#[derive(Debug, Deserialize)]
pub struct AdminForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub async fn create_admin(State(state): State<AppState>, headers: HeaderMap, Form(form): Form<AdminForm>) -> AppResult<Redirect> {
    require_admin(&state, &headers).await?;
    let input = AdminInput { email: form.email, password: form.password };
    security::create_admin(state.users.as_ref(), &input).await?;
    Ok(Redirect::to(ADMINS_PAGE))
}
