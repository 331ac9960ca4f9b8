use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// External blob storage. `put` returns the durable URL kept on the post record.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, pathname: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
    async fn delete(&self, url: &str) -> Result<()>;
}

pub type SharedBlobs = Arc<dyn BlobStore>;

/// Blobs as plain files under a local folder; URLs are `/blobs/<pathname>`.
pub struct LocalBlobStore {
    root: PathBuf,
}

const LOCAL_PREFIX: &str = "/blobs/";

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create blob folder: {}", root.display()))?;
        Ok(Self { root })
    }

    fn resolve(&self, url: &str) -> Result<PathBuf> {
        let rel = url.strip_prefix(LOCAL_PREFIX).ok_or_else(|| anyhow!("not a local blob url: {}", url))?;
        let rel = Path::new(rel);
        if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(anyhow!("invalid blob path: {}", url));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, pathname: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let url = format!("{}{}", LOCAL_PREFIX, pathname.trim_start_matches('/'));
        let path = self.resolve(&url)?;
        if let Some(dir) = path.parent() { tokio::fs::create_dir_all(dir).await?; }
        tokio::fs::write(&path, bytes).await.with_context(|| format!("writing blob {}", path.display()))?;
        Ok(url)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.resolve(url)?;
        Ok(tokio::fs::read(&path).await.with_context(|| format!("reading blob {}", path.display()))?)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let path = self.resolve(url)?;
        tokio::fs::remove_file(&path).await.with_context(|| format!("deleting blob {}", path.display()))?;
        Ok(())
    }
}

/// Vercel Blob over its REST API, authenticated with the read/write token.
pub struct VercelBlobStore {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

#[derive(Deserialize)]
struct PutBlobResult {
    url: String,
}

impl VercelBlobStore {
    pub fn new(token: String) -> Result<Self> {
        Self::with_api_base(token, "https://blob.vercel-storage.com")
    }

    pub fn with_api_base(token: String, api_base: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, token, api_base: api_base.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl BlobStore for VercelBlobStore {
    async fn put(&self, pathname: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let url = format!("{}/{}", self.api_base, pathname.trim_start_matches('/'));
        let resp = self.client
            .put(url)
            .bearer_auth(&self.token)
            .header("x-api-version", "7")
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .body(bytes)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("blob put failed: HTTP {}", resp.status()));
        }
        let out: PutBlobResult = resp.json().await?;
        Ok(out.url)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("blob fetch failed: HTTP {}", resp.status()));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let resp = self.client
            .post(format!("{}/delete", self.api_base))
            .bearer_auth(&self.token)
            .header("x-api-version", "7")
            .json(&serde_json::json!({"urls": [url]}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!("blob delete failed: HTTP {}", resp.status()));
        }
        Ok(())
    }
}
