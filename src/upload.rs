use async_trait::async_trait;
use reqwest::header::LOCATION;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{resolve_secret, UploadConfig};
use crate::error::{Result, LingoError};
use crate::metadata::VideoMetadata;

/// Identifiers of a published video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub video_id: String,
    pub thumbnail_url: String,
}

/// Publishes a finished video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoUploader: Send + Sync {
    async fn upload(&self, video: &Path, metadata: &VideoMetadata) -> Result<UploadReceipt>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
    #[serde(default)]
    snippet: Option<UploadedSnippet>,
}

#[derive(Debug, Deserialize)]
struct UploadedSnippet {
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    #[serde(default)]
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl UploadedVideo {
    fn into_receipt(self) -> UploadReceipt {
        let thumbnail_url = self
            .snippet
            .and_then(|s| s.thumbnails)
            .and_then(|t| t.default)
            .map(|t| t.url)
            .unwrap_or_else(|| default_thumbnail_url(&self.id));

        UploadReceipt {
            video_id: self.id,
            thumbnail_url,
        }
    }
}

pub fn default_thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/default.jpg", video_id)
}

/// Video resource sent when opening the upload session
pub fn video_resource(metadata: &VideoMetadata, privacy_status: &str) -> serde_json::Value {
    json!({
        "snippet": {
            "title": metadata.title,
            "description": metadata.description,
            "tags": metadata.tags,
            "categoryId": metadata.category_id,
            "defaultLanguage": metadata.language,
        },
        "status": {
            "privacyStatus": privacy_status,
            "selfDeclaredMadeForKids": false,
        }
    })
}

/// YouTube Data API v3 uploader using an OAuth refresh token
pub struct YouTubeUploader {
    client: reqwest::Client,
    config: UploadConfig,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl YouTubeUploader {
    pub fn from_config(config: &UploadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            client_id: resolve_secret(&config.client_id_env)?,
            client_secret: resolve_secret(&config.client_secret_env)?,
            refresh_token: resolve_secret(&config.refresh_token_env)?,
        })
    }

    /// Exchange the refresh token for a short-lived access token
    async fn access_token(&self) -> Result<String> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| LingoError::Upload(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LingoError::Upload(format!(
                "Token refresh rejected {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| LingoError::Upload(format!("Failed to parse token response: {}", e)))?;
        Ok(token.access_token)
    }

    /// Open a resumable upload session and return its URL
    async fn start_session(&self, token: &str, metadata: &VideoMetadata, size: u64) -> Result<String> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", size.to_string())
            .json(&video_resource(metadata, &self.config.privacy_status))
            .send()
            .await
            .map_err(|e| LingoError::Upload(format!("Session request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LingoError::Upload(format!(
                "Upload session rejected {}: {}",
                status, error_text
            )));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
            .ok_or_else(|| LingoError::Upload("Upload session has no location".to_string()))
    }
}

#[async_trait]
impl VideoUploader for YouTubeUploader {
    async fn upload(&self, video: &Path, metadata: &VideoMetadata) -> Result<UploadReceipt> {
        if !video.exists() {
            return Err(LingoError::FileNotFound(video.display().to_string()));
        }

        let bytes = tokio::fs::read(video).await?;
        let token = self.access_token().await?;
        let session = self.start_session(&token, metadata, bytes.len() as u64).await?;
        debug!("Uploading {} bytes to {}", bytes.len(), session);

        let response = self
            .client
            .put(&session)
            .bearer_auth(&token)
            .header("Content-Type", "video/mp4")
            .body(bytes)
            .send()
            .await
            .map_err(|e| LingoError::Upload(format!("Upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LingoError::Upload(format!("Upload rejected {}: {}", status, error_text)));
        }

        let uploaded: UploadedVideo = response
            .json()
            .await
            .map_err(|e| LingoError::Upload(format!("Failed to parse upload response: {}", e)))?;

        let receipt = uploaded.into_receipt();
        info!("Uploaded '{}' as video {}", metadata.title, receipt.video_id);
        Ok(receipt)
    }
}
