// Catalog of published videos
//
// - Store: local JSON-file catalog
// - Client: remote catalog reached over its HTTP API
// - Api: the HTTP API itself (axum)
//
// Pagination and date filtering are plain functions shared by the API and
// the CLI.

pub mod api;
pub mod client;
pub mod store;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use client::HttpCatalogClient;
pub use store::JsonCatalog;
use crate::config::{CatalogBackend, CatalogConfig};
use crate::error::{Result, LingoError};

/// Metadata of one published video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub sentence: Option<String>,
    #[serde(default)]
    pub translated_sentence: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub upload_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl VideoRecord {
    pub fn new<S: Into<String>>(video_id: S) -> Self {
        Self {
            video_id: video_id.into(),
            word: None,
            sentence: None,
            translated_sentence: None,
            title: None,
            description: None,
            upload_time: None,
            thumbnail_url: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.video_id.trim().is_empty() {
            return Err(LingoError::Catalog("video_id must not be empty".to_string()));
        }
        if let Some(title) = &self.title {
            if title.chars().count() > crate::metadata::MAX_TITLE_CHARS {
                return Err(LingoError::Catalog(format!(
                    "title is longer than {} characters",
                    crate::metadata::MAX_TITLE_CHARS
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Persistent store of video records keyed by `video_id`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a record or replace the one with the same id
    async fn upsert(&self, record: &VideoRecord) -> Result<UpsertOutcome>;

    /// All records, newest upload first
    async fn list(&self) -> Result<Vec<VideoRecord>>;

    async fn get(&self, video_id: &str) -> Result<Option<VideoRecord>>;

    /// Returns whether a record was removed
    async fn delete(&self, video_id: &str) -> Result<bool>;
}

/// Factory for creating catalog stores
pub struct CatalogFactory;

impl CatalogFactory {
    pub fn create(config: &CatalogConfig) -> Result<Box<dyn MetadataStore>> {
        match config.backend {
            CatalogBackend::File => Ok(Box::new(JsonCatalog::open(&config.path)?)),
            CatalogBackend::Http => {
                let base_url = config.api_base_url.clone().ok_or_else(|| {
                    LingoError::Config("catalog.api_base_url is required for the http backend".to_string())
                })?;
                let api_key = crate::config::resolve_secret(&config.api_key_env)?;
                Ok(Box::new(HttpCatalogClient::new(base_url, api_key)?))
            }
        }
    }
}

/// Order records newest upload first; records without a time go last
pub fn sort_newest_first(records: &mut [VideoRecord]) {
    records.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
}

/// Keep records uploaded within the inclusive date range.
/// Records without an upload time are dropped when any bound is set.
pub fn filter_by_date(
    records: Vec<VideoRecord>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<VideoRecord> {
    if start.is_none() && end.is_none() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| match record.upload_time {
            Some(time) => {
                let date = time.date_naive();
                start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
            }
            None => false,
        })
        .collect()
}

/// One page of records plus navigation details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub videos: Vec<VideoRecord>,
    pub total_videos: usize,
    pub total_pages: usize,
    pub current_page: i64,
    pub has_next: bool,
    pub has_previous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Slice `records` into 1-based pages of `limit`. A page outside the valid
/// range yields no videos and a detail message. There is always at least one page.
pub fn paginate(records: Vec<VideoRecord>, page: i64, limit: usize) -> Page {
    let limit = limit.max(1);
    let total_videos = records.len();
    let total_pages = total_videos.div_ceil(limit).max(1);

    if page < 1 || page as usize > total_pages {
        return Page {
            videos: Vec::new(),
            total_videos,
            total_pages,
            current_page: page,
            has_next: false,
            has_previous: false,
            detail: Some(
                "Page number out of range - it's likely that no older videos are available".to_string(),
            ),
        };
    }

    let index = page as usize;
    let videos = records
        .into_iter()
        .skip((index - 1) * limit)
        .take(limit)
        .collect();

    Page {
        videos,
        total_videos,
        total_pages,
        current_page: page,
        has_next: index < total_pages,
        has_previous: index > 1,
        detail: None,
    }
}
