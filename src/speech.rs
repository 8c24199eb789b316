use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{resolve_secret, MediaConfig, SpeechConfig};
use crate::error::{Result, LingoError};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};

/// Narration written to disk, with its measured length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechArtifact {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Text-to-speech capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` in `language`, writing audio to `output`
    async fn synthesize(&self, text: &str, language: &str, output: &Path) -> Result<SpeechArtifact>;
}

/// Synthesizer for OpenAI-compatible `/v1/audio/speech` endpoints
pub struct OpenAiSpeechSynthesizer {
    client: reqwest::Client,
    config: SpeechConfig,
    api_key: String,
    media: Box<dyn MediaProcessorTrait>,
}

impl OpenAiSpeechSynthesizer {
    pub fn new(config: SpeechConfig, api_key: String, media: Box<dyn MediaProcessorTrait>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
            media,
        })
    }

    pub fn from_config(config: &SpeechConfig, media: &MediaConfig) -> Result<Self> {
        let api_key = resolve_secret(&config.api_key_env)?;
        Self::new(
            config.clone(),
            api_key,
            MediaProcessorFactory::create_processor(media.clone()),
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechSynthesizer {
    async fn synthesize(&self, text: &str, language: &str, output: &Path) -> Result<SpeechArtifact> {
        if text.trim().is_empty() {
            return Err(LingoError::Speech("Nothing to synthesize".to_string()));
        }

        let url = format!("{}/v1/audio/speech", self.config.endpoint.trim_end_matches('/'));
        debug!("Requesting {} speech from {}", language, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.config.model,
                "voice": self.config.voice,
                "input": text,
                "response_format": "wav",
            }))
            .send()
            .await
            .map_err(|e| LingoError::Speech(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LingoError::Speech(format!("TTS API error {}: {}", status, error_text)));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| LingoError::Speech(format!("Failed to read audio: {}", e)))?;
        if audio.is_empty() {
            return Err(LingoError::Speech("Empty audio received".to_string()));
        }

        tokio::fs::write(output, &audio).await?;
        let duration_secs = self.media.probe_duration(output).await?;

        info!("Synthesized {:.2}s of speech to {}", duration_secs, output.display());
        Ok(SpeechArtifact {
            path: output.to_path_buf(),
            duration_secs,
        })
    }
}
