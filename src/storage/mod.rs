//!
//! svboard storage module
//! ----------------------
//! Records for admin users and flyer posts, and the store traits the handlers depend on.
//! Handlers only see `Arc<dyn UserStore>` / `Arc<dyn PostStore>`; the bundled
//! implementation is the JSON-file backed `JsonStore`, which also runs purely in memory
//! for tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::identity::Role;

mod json;

pub use json::JsonStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Unique across users; compared case-sensitively as entered.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A flyer or announcement with its PDF attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Durable URL returned by the blob store.
    pub pdf_path: String,
    pub published: bool,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable post fields, shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub published: bool,
    pub pinned: bool,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn insert_user(&self, user: User) -> Result<()>;
    async fn list_users(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get_post(&self, id: &str) -> Result<Option<Post>>;
    async fn insert_post(&self, post: Post) -> Result<()>;
    /// Replace the editable fields and the PDF path; returns false when the post is gone.
    async fn update_post(&self, id: &str, fields: PostFields, pdf_path: String) -> Result<bool>;
    async fn delete_post(&self, id: &str) -> Result<Option<Post>>;
    /// All posts, pinned first then newest first.
    async fn list_posts(&self) -> Result<Vec<Post>>;
}

pub type SharedUsers = Arc<dyn UserStore>;
pub type SharedPosts = Arc<dyn PostStore>;

/// Listing order used by both the admin overview and the public flyer page.
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.pinned.cmp(&a.pinned).then(b.created_at.cmp(&a.created_at)));
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;
