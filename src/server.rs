//!
//! svboard HTTP server
//! -------------------
//! Axum router for the student council site.
//!
//! Responsibilities:
//! - Stateless cookie sessions: login issues a signed token, logout clears the cookie.
//! - Access guard middleware in front of every `/admin/*` route.
//! - Admin actions for posts (multipart, with PDF upload) and admin accounts.
//! - Public flyer listing and the file endpoint that proxies stored PDFs.
//! - Owner bootstrap and startup logs.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::identity::{self, CookieGateway, LocalAuthProvider, SessionCodec};
use crate::security;
use crate::storage::{JsonStore, Post, SharedPosts, SharedUsers};
use crate::uploads::{LocalBlobStore, SharedBlobs, VercelBlobStore, MAX_UPLOAD_BYTES};

pub mod admin;
pub mod auth;
pub mod files;
pub mod public;

/// Shared handles for all handlers. Every collaborator is injected; nothing is global.
#[derive(Clone)]
pub struct AppState {
    pub users: SharedUsers,
    pub posts: SharedPosts,
    pub blobs: SharedBlobs,
    pub codec: SessionCodec,
    pub cookies: CookieGateway,
    pub auth: LocalAuthProvider,
}

impl AppState {
    pub fn new(users: SharedUsers, posts: SharedPosts, blobs: SharedBlobs, codec: SessionCodec, cookies: CookieGateway) -> Self {
        let auth = LocalAuthProvider::new(users.clone(), codec.clone());
        Self { users, posts, blobs, codec, cookies, auth }
    }
}

/// Post as rendered to clients, with the link to its PDF.
#[derive(Debug, serde::Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub file_url: String,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        let file_url = format!("/api/files/{}", post.id);
        Self { post, file_url }
    }
}

// Uploads slightly over the limit still reach the validator so the user sees "too large"
pub const BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 4 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/flyer") }))
        .route("/flyer", get(public::list_flyers))
        .route("/flyer/{id}", get(public::show_flyer))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/files/{id}", get(files::serve_file))
        .route("/admin/login", get(auth::login_page))
        .route("/admin/posts", get(admin::list_posts).post(admin::create_post))
        .route("/admin/posts/{id}", get(admin::show_post).post(admin::update_post))
        .route("/admin/posts/{id}/delete", post(admin::delete_post))
        .route("/admin/admins", get(admin::list_admins).post(admin::create_admin))
        .fallback(|| async { AppError::not_found("not_found", "Not found") })
        .layer(middleware::from_fn_with_state(state.clone(), identity::intercept))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

fn log_startup(cfg: &Config) {
    let cwd = std::env::current_dir().ok();
    let data_exists = Path::new(&cfg.data_folder).exists();
    info!(
        target: "startup",
        "svboard starting: cwd={:?}, data_folder={:?} (exists={}), http_port={}, production={}, blob_backend={}, owner_bootstrap={}",
        cwd,
        cfg.data_folder,
        data_exists,
        cfg.http_port,
        cfg.production,
        if cfg.blob_token.is_some() { "vercel" } else { "local" },
        cfg.owner_credentials().is_some()
    );
}

/// Start the council site: validate the secret, open the store, bootstrap the owner,
/// choose the blob backend and serve.
pub async fn run(cfg: Config) -> anyhow::Result<()> {
    log_startup(&cfg);

    let codec = SessionCodec::from_secret(cfg.jwt_secret.as_deref())
        .context("While initialising the session signing secret")?;
    let store = Arc::new(
        JsonStore::open(&cfg.data_folder).with_context(|| format!("While opening store under: {}", cfg.data_folder))?,
    );
    if let Some((email, password)) = cfg.owner_credentials() {
        security::ensure_owner_admin(store.as_ref(), email, password)
            .await
            .context("While ensuring the owner admin")?;
    }
    let blobs: SharedBlobs = match &cfg.blob_token {
        Some(token) => Arc::new(VercelBlobStore::new(token.clone())?),
        None => Arc::new(LocalBlobStore::new(Path::new(&cfg.data_folder).join("blobs"))?),
    };
    let users: SharedUsers = store.clone();
    let posts: SharedPosts = store;
    let state = AppState::new(users, posts, blobs, codec, CookieGateway::new(cfg.production));

    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
