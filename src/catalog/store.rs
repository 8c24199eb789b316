use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{sort_newest_first, MetadataStore, UpsertOutcome, VideoRecord};
use crate::error::{Result, LingoError};

/// Catalog kept as a JSON array in a single file
pub struct JsonCatalog {
    path: PathBuf,
    records: RwLock<Vec<VideoRecord>>,
}

impl JsonCatalog {
    /// Open the catalog, starting empty if the file does not exist yet
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    LingoError::Catalog(format!("Invalid catalog {}: {}", path.display(), e))
                })?
            }
        } else {
            Vec::new()
        };

        debug!("Opened catalog {} with {} records", path.display(), records.len());
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &[VideoRecord]) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let json = serde_json::to_string_pretty(records)?;
        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| LingoError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for JsonCatalog {
    async fn upsert(&self, record: &VideoRecord) -> Result<UpsertOutcome> {
        record.validate()?;
        let mut records = self.records.write().await;

        let mut next = records.clone();
        let outcome = match next.iter_mut().find(|r| r.video_id == record.video_id) {
            Some(existing) => {
                *existing = record.clone();
                UpsertOutcome::Updated
            }
            None => {
                next.push(record.clone());
                UpsertOutcome::Created
            }
        };

        self.persist(&next)?;
        *records = next;

        info!("{:?} catalog record {}", outcome, record.video_id);
        Ok(outcome)
    }

    async fn list(&self) -> Result<Vec<VideoRecord>> {
        let mut records = self.records.read().await.clone();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn get(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.video_id == video_id).cloned())
    }

    async fn delete(&self, video_id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        if !records.iter().any(|r| r.video_id == video_id) {
            return Ok(false);
        }

        let next: Vec<VideoRecord> = records
            .iter()
            .filter(|r| r.video_id != video_id)
            .cloned()
            .collect();
        self.persist(&next)?;
        *records = next;

        info!("Deleted catalog record {}", video_id);
        Ok(true)
    }
}
