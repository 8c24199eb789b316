use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

use super::{sort_newest_first, MetadataStore, UpsertOutcome, VideoRecord};
use crate::error::{Result, LingoError};

pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Client for a remote catalog exposing the `/today/videos/` API
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/today/videos/{}", self.base_url, path)
    }
}

/// Map the write endpoint's status to an upsert outcome
pub fn upsert_outcome(status: StatusCode) -> Result<UpsertOutcome> {
    match status {
        StatusCode::CREATED => Ok(UpsertOutcome::Created),
        StatusCode::OK => Ok(UpsertOutcome::Updated),
        StatusCode::FORBIDDEN => Err(LingoError::Catalog("API key rejected".to_string())),
        other => Err(LingoError::Catalog(format!("write-to-db returned {}", other))),
    }
}

#[async_trait]
impl MetadataStore for HttpCatalogClient {
    async fn upsert(&self, record: &VideoRecord) -> Result<UpsertOutcome> {
        record.validate()?;
        let url = self.url("write-to-db/");
        debug!("Posting catalog record {} to {}", record.video_id, url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(record)
            .send()
            .await
            .map_err(|e| LingoError::Catalog(format!("HTTP request failed: {}", e)))?;

        let outcome = upsert_outcome(response.status())?;
        info!("{:?} remote catalog record {}", outcome, record.video_id);
        Ok(outcome)
    }

    async fn list(&self) -> Result<Vec<VideoRecord>> {
        let response = self
            .client
            .get(self.url(""))
            .send()
            .await
            .map_err(|e| LingoError::Catalog(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(LingoError::Catalog(format!("list returned {}", response.status())));
        }

        let mut records: Vec<VideoRecord> = response.json().await?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn get(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        let response = self
            .client
            .get(self.url(&format!("{}/", video_id)))
            .send()
            .await
            .map_err(|e| LingoError::Catalog(format!("HTTP request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(LingoError::Catalog(format!("get returned {}", status))),
        }
    }

    async fn delete(&self, video_id: &str) -> Result<bool> {
        let response = self
            .client
            .delete(self.url(&format!("{}/", video_id)))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| LingoError::Catalog(format!("HTTP request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(LingoError::Catalog(format!("delete returned {}", status))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_outcome() {
        assert_eq!(upsert_outcome(StatusCode::CREATED).unwrap(), UpsertOutcome::Created);
        assert_eq!(upsert_outcome(StatusCode::OK).unwrap(), UpsertOutcome::Updated);
        assert!(upsert_outcome(StatusCode::FORBIDDEN).is_err());
        assert!(upsert_outcome(StatusCode::BAD_REQUEST).is_err());
    }

    #[test]
    fn test_urls() {
        let client = HttpCatalogClient::new("https://catalog.example/".to_string(), "k".to_string()).unwrap();
        assert_eq!(client.url("write-to-db/"), "https://catalog.example/today/videos/write-to-db/");
        assert_eq!(client.url(""), "https://catalog.example/today/videos/");
    }
}
