use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, ETAG, IF_MATCH};
use reqwest::StatusCode;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

use super::{parse_pool, render_pool, PoolSnapshot, PoolStore, PoolVersion};
use crate::error::{Result, LingoError};

/// Version token of a stored pool text
fn content_version(text: &str) -> PoolVersion {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    PoolVersion(format!("{:016x}", hasher.finish()))
}

/// Pool kept in a local newline-separated text file
pub struct FilePoolStore {
    path: PathBuf,
}

impl FilePoolStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_text(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(LingoError::FileNotFound(self.path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file contents in one rename so readers never see a partial pool
    fn persist_atomically(&self, text: &str) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(text.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| LingoError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl PoolStore for FilePoolStore {
    async fn read(&self) -> Result<PoolSnapshot> {
        let text = self.read_text().await?;
        let words = parse_pool(&text)?;
        Ok(PoolSnapshot {
            words,
            version: content_version(&text),
        })
    }

    async fn write(&self, words: &[String], expected: &PoolVersion) -> Result<PoolVersion> {
        let current = content_version(&self.read_text().await?);
        if &current != expected {
            return Err(LingoError::PoolConflict {
                expected: expected.to_string(),
                found: current.to_string(),
            });
        }

        let text = render_pool(words);
        self.persist_atomically(&text)?;
        debug!("Wrote {} words to {}", words.len(), self.path.display());

        Ok(content_version(&text))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Pool kept as a single object in remote blob storage.
///
/// Versions are the object's ETag and writes are conditional on it, so a
/// concurrent writer makes the second write fail with a conflict.
pub struct BlobPoolStore {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl BlobPoolStore {
    pub fn new(url: String, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { client, url, token })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, &self.url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn etag(response: &reqwest::Response) -> Option<PoolVersion> {
        response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(|value| PoolVersion(value.to_string()))
    }
}

#[async_trait]
impl PoolStore for BlobPoolStore {
    async fn read(&self) -> Result<PoolSnapshot> {
        let response = self.request(reqwest::Method::GET).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LingoError::FileNotFound(self.url.clone()));
        }
        if !response.status().is_success() {
            return Err(LingoError::Storage(format!(
                "GET {} returned {}",
                self.url,
                response.status()
            )));
        }

        let version = Self::etag(&response).ok_or_else(|| {
            LingoError::Storage(format!("{} did not return an ETag", self.url))
        })?;
        let text = response.text().await?;

        Ok(PoolSnapshot {
            words: parse_pool(&text)?,
            version,
        })
    }

    async fn write(&self, words: &[String], expected: &PoolVersion) -> Result<PoolVersion> {
        let response = self
            .request(reqwest::Method::PUT)
            .header(IF_MATCH, expected.0.as_str())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(render_pool(words))
            .send()
            .await?;

        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Err(LingoError::PoolConflict {
                expected: expected.to_string(),
                found: "changed remotely".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(LingoError::Storage(format!(
                "PUT {} returned {}",
                self.url,
                response.status()
            )));
        }

        match Self::etag(&response) {
            Some(version) => Ok(version),
            None => Ok(self.read().await?.version),
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Default)]
struct MemoryPool {
    words: Vec<String>,
    generation: u64,
    writes: usize,
}

/// In-process pool, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryPoolStore {
    inner: Arc<Mutex<MemoryPool>>,
}

impl MemoryPoolStore {
    pub fn new(words: Vec<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryPool {
                words,
                generation: 0,
                writes: 0,
            })),
        }
    }

    pub async fn words(&self) -> Vec<String> {
        self.inner.lock().await.words.clone()
    }

    /// Number of successful writes so far
    pub async fn writes(&self) -> usize {
        self.inner.lock().await.writes
    }
}

#[async_trait]
impl PoolStore for MemoryPoolStore {
    async fn read(&self) -> Result<PoolSnapshot> {
        let pool = self.inner.lock().await;
        Ok(PoolSnapshot {
            words: pool.words.clone(),
            version: PoolVersion(pool.generation.to_string()),
        })
    }

    async fn write(&self, words: &[String], expected: &PoolVersion) -> Result<PoolVersion> {
        let mut pool = self.inner.lock().await;
        let current = PoolVersion(pool.generation.to_string());
        if &current != expected {
            return Err(LingoError::PoolConflict {
                expected: expected.to_string(),
                found: current.to_string(),
            });
        }

        pool.words = words.to_vec();
        pool.generation += 1;
        pool.writes += 1;
        Ok(PoolVersion(pool.generation.to_string()))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
