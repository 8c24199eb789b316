use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{resolve_secret, ImageConfig};
use crate::error::{Result, LingoError};

/// Illustration generator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate `count` images for `prompt` into `output_dir` as `image-N.png`
    async fn generate(&self, prompt: &str, count: usize, output_dir: &Path) -> Result<Vec<PathBuf>>;
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

/// File name of the n-th image of a run (1-based)
pub fn image_file_name(index: usize) -> String {
    format!("image-{}.png", index)
}

/// Generator for OpenAI-compatible `/v1/images/generations` endpoints
pub struct OpenAiImageGenerator {
    client: reqwest::Client,
    config: ImageConfig,
    api_key: String,
}

impl OpenAiImageGenerator {
    pub fn new(config: ImageConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn from_config(config: &ImageConfig) -> Result<Self> {
        let api_key = resolve_secret(&config.api_key_env)?;
        Self::new(config.clone(), api_key)
    }

    /// Request one image and return its download URL
    async fn request_image(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/images/generations", self.config.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.config.model,
                "prompt": prompt,
                "size": self.config.size,
                "quality": self.config.quality,
                "n": 1,
            }))
            .send()
            .await
            .map_err(|e| LingoError::Image(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LingoError::Image(format!("Image API error {}: {}", status, error_text)));
        }

        let body: ImagesResponse = response
            .json()
            .await
            .map_err(|e| LingoError::Image(format!("Failed to parse response: {}", e)))?;

        body.data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or_else(|| LingoError::Image("Response contained no image URL".to_string()))
    }

    async fn download(&self, url: &str, path: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LingoError::Image(format!("Image download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(LingoError::Image(format!(
                "Image download returned {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, prompt: &str, count: usize, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(count);

        // Some models only accept n=1, so request one image at a time
        for index in 1..=count {
            let url = self.request_image(prompt).await?;
            let path = output_dir.join(image_file_name(index));
            debug!("Downloading image {} from {}", index, url);
            self.download(&url, &path).await?;
            paths.push(path);
        }

        info!("Generated {} image(s) in {}", paths.len(), output_dir.display());
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_file_name() {
        assert_eq!(image_file_name(1), "image-1.png");
        assert_eq!(image_file_name(12), "image-12.png");
    }

    #[test]
    fn test_response_url_extraction() {
        let body: ImagesResponse = serde_json::from_str(
            r#"{"created": 1, "data": [{"revised_prompt": "x", "url": "https://img/1.png"}]}"#,
        )
        .unwrap();
        assert_eq!(body.data[0].url.as_deref(), Some("https://img/1.png"));
    }
}
