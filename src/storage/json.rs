use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::{sort_posts, Post, PostFields, PostStore, User, UserStore};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    posts: Vec<Post>,
}

/// Users and posts held in memory, optionally mirrored to a single JSON file.
///
/// Mutations are applied to a copy of the tables, written through a temp file + rename,
/// and only then swapped in: a failed write leaves both the file and memory untouched.
/// Writers queue on `writer`; readers never wait on disk I/O.
pub struct JsonStore {
    path: Option<PathBuf>,
    tables: RwLock<Tables>,
    writer: Mutex<()>,
}

impl JsonStore {
    pub fn in_memory() -> Self {
        Self { path: None, tables: RwLock::new(Tables::default()), writer: Mutex::new(()) }
    }

    /// Open `<root>/store.json`, creating the folder when needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create or access data folder: {}", root.display()))?;
        let path = root.join("store.json");
        let tables = if path.exists() {
            let raw = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_slice::<Tables>(&raw).with_context(|| format!("parsing {}", path.display()))?
        } else {
            Tables::default()
        };
        debug!(target: "storage", users = tables.users.len(), posts = tables.posts.len(), "store opened");
        Ok(Self { path: Some(path), tables: RwLock::new(tables), writer: Mutex::new(()) })
    }

    async fn persist(&self, tables: &Tables) -> Result<()> {
        let Some(path) = self.path.clone() else { return Ok(()); };
        let bytes = serde_json::to_vec_pretty(tables)?;
        tokio::task::spawn_blocking(move || -> Result<()> {
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
            if let Err(e) = std::fs::rename(&tmp, &path) {
                let _ = std::fs::remove_file(&tmp);
                return Err(e).with_context(|| format!("replacing {}", path.display()));
            }
            Ok(())
        })
        .await?
    }

    /// Run `change` on a copy of the tables, persist it, then publish it.
    async fn commit<T: Send>(&self, change: impl FnOnce(&mut Tables) -> Result<T> + Send) -> Result<T> {
        let _turn = self.writer.lock().await;
        let mut next = self.tables.read().clone();
        let out = change(&mut next)?;
        self.persist(&next).await?;
        *self.tables.write() = next;
        Ok(out)
    }
}

#[async_trait]
impl UserStore for JsonStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.tables.read().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.tables.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        self.commit(move |t| {
            if t.users.iter().any(|u| u.email == user.email) {
                return Err(anyhow!("email already exists: {}", user.email));
            }
            t.users.push(user);
            Ok(())
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users = self.tables.read().users.clone();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl PostStore for JsonStore {
    async fn get_post(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.tables.read().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_post(&self, post: Post) -> Result<()> {
        self.commit(move |t| {
            t.posts.push(post);
            Ok(())
        })
        .await
    }

    async fn update_post(&self, id: &str, fields: PostFields, pdf_path: String) -> Result<bool> {
        if self.get_post(id).await?.is_none() {
            return Ok(false);
        }
        self.commit(move |t| {
            let Some(post) = t.posts.iter_mut().find(|p| p.id == id) else { return Ok(false); };
            post.title = fields.title;
            post.description = fields.description;
            post.content = fields.content;
            post.published = fields.published;
            post.pinned = fields.pinned;
            post.pdf_path = pdf_path;
            post.updated_at = chrono::Utc::now();
            Ok(true)
        })
        .await
    }

    async fn delete_post(&self, id: &str) -> Result<Option<Post>> {
        if self.get_post(id).await?.is_none() {
            return Ok(None);
        }
        self.commit(move |t| {
            let removed = t.posts.iter().position(|p| p.id == id).map(|idx| t.posts.remove(idx));
            Ok(removed)
        })
        .await
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let mut posts = self.tables.read().posts.clone();
        sort_posts(&mut posts);
        Ok(posts)
    }
}
