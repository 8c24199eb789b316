use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, LingoError};

// Default values for fields that older config files may not carry
fn default_max_words() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub language: LanguageConfig,
    pub pool: PoolConfig,
    pub oracle: OracleConfig,
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub image: ImageConfig,
    pub subtitle: SubtitleConfig,
    pub media: MediaConfig,
    pub upload: UploadConfig,
    pub catalog: CatalogConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Language code of the words being taught (e.g. "es")
    pub learn: String,
    /// Language code the sentence is translated into (e.g. "en")
    pub native: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Where the word pool lives
    pub backend: PoolBackend,
    /// Path of the word list when using the file backend
    pub path: PathBuf,
    /// Object URL when using the blob backend
    pub blob_url: Option<String>,
    /// Environment variable holding a bearer token for the blob backend
    pub blob_token_env: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolBackend {
    /// Local text file, one word per line
    File,
    /// Remote object addressed by URL, written with If-Match
    Blob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Which real-word check to use
    pub mode: OracleMode,
    /// Word list used by the lexicon oracle
    pub lexicon_path: PathBuf,
    /// Dictionary search endpoint
    pub api_url: String,
    /// Value for the X-RapidAPI-Host header
    pub api_host: String,
    /// Environment variable holding the dictionary API key
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleMode {
    /// Local lexicon lookup, no network access
    Lexicon,
    /// Remote dictionary search API
    Dictionary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama endpoint URL
    pub endpoint: String,
    /// Model used for sentence generation and translation
    pub model: String,
    /// Prompt for the example sentence; `{word}` is replaced with the chosen word
    pub sentence_prompt: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// OpenAI-compatible API base URL
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// OpenAI-compatible API base URL
    pub endpoint: String,
    pub model: String,
    /// Requested image size, e.g. "1024x1792" for vertical shorts
    pub size: String,
    pub quality: String,
    /// Number of images shown one after another in the video
    pub count: usize,
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleConfig {
    /// Seconds of speech a caption group may hold before it is closed
    pub threshold_secs: f64,
    /// Maximum words shown in one caption group
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    /// How caption groups are placed on the timeline
    pub timing: SlotTiming,
    /// Additional characters counted as vowels for the target language
    pub extra_vowels: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotTiming {
    /// Group i occupies [i * threshold, (i + 1) * threshold)
    Fixed,
    /// Groups occupy their accumulated spoken time, ending at the audio duration
    Proportional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_path: String,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    /// Additional encoding options appended before the output path
    /// Common options: ["-preset", "medium", "-crf", "23"]
    pub encode_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Resumable upload endpoint of the video host
    pub endpoint: String,
    /// OAuth token endpoint used to exchange the refresh token
    pub token_url: String,
    pub client_id_env: String,
    pub client_secret_env: String,
    pub refresh_token_env: String,
    pub privacy_status: String,
    pub category_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Where video metadata is recorded after upload
    pub backend: CatalogBackend,
    /// JSON file used by the file backend and by `serve`
    pub path: PathBuf,
    /// Base URL of a remote catalog API for the http backend
    pub api_base_url: Option<String>,
    /// Environment variable holding the static API key
    pub api_key_env: String,
    /// Address the catalog API binds to
    pub bind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    File,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory under which each run gets its own artifact folder
    pub work_dir: PathBuf,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            learn: "es".to_string(),
            native: "en".to_string(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            backend: PoolBackend::File,
            path: PathBuf::from("words.txt"),
            blob_url: None,
            blob_token_env: None,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            mode: OracleMode::Lexicon,
            lexicon_path: PathBuf::from("lexicon.txt"),
            api_url: "https://lexicala1.p.rapidapi.com/search".to_string(),
            api_host: "lexicala1.p.rapidapi.com".to_string(),
            api_key_env: "RAPID_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            sentence_prompt: "escribe una frase de ejemplo sobre el uso de la palabra {word}".to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com".to_string(),
            model: "dall-e-3".to_string(),
            size: "1024x1792".to_string(),
            quality: "standard".to_string(),
            count: 1,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            threshold_secs: 3.0,
            max_words: default_max_words(),
            timing: SlotTiming::Fixed,
            extra_vowels: String::new(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            probe_path: "ffprobe".to_string(),
            fps: 24,
            width: 1080,
            height: 1920,
            encode_options: vec![
                // "-preset".to_string(), "medium".to_string(),
                // "-crf".to_string(), "23".to_string(),
            ],
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/upload/youtube/v3/videos".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            client_id_env: "YOUTUBE_CLIENT_ID".to_string(),
            client_secret_env: "YOUTUBE_CLIENT_SECRET".to_string(),
            refresh_token_env: "YOUTUBE_REFRESH_TOKEN".to_string(),
            privacy_status: "public".to_string(),
            // Education
            category_id: "27".to_string(),
            timeout_secs: 600,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: CatalogBackend::File,
            path: PathBuf::from(".lingoshort/catalog.json"),
            api_base_url: None,
            api_key_env: "EXPECTED_API_KEY".to_string(),
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(".lingoshort/runs"),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LingoError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| LingoError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LingoError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LingoError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.subtitle.threshold_secs.is_finite() && self.subtitle.threshold_secs > 0.0) {
            return Err(LingoError::Config(format!(
                "subtitle.threshold_secs must be positive, got {}",
                self.subtitle.threshold_secs
            )));
        }
        if self.subtitle.max_words == 0 {
            return Err(LingoError::Config("subtitle.max_words must be at least 1".to_string()));
        }
        if self.image.count == 0 {
            return Err(LingoError::Config("image.count must be at least 1".to_string()));
        }
        if self.pool.backend == PoolBackend::Blob && self.pool.blob_url.is_none() {
            return Err(LingoError::Config("pool.blob_url is required for the blob backend".to_string()));
        }
        if self.catalog.backend == CatalogBackend::Http && self.catalog.api_base_url.is_none() {
            return Err(LingoError::Config("catalog.api_base_url is required for the http backend".to_string()));
        }
        Ok(())
    }
}

/// Read a secret from the environment variable named in the config
pub fn resolve_secret(env_name: &str) -> Result<String> {
    match std::env::var(env_name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LingoError::Config(format!(
            "Environment variable {} is not set",
            env_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.subtitle.threshold_secs, 3.0);
        assert_eq!(config.subtitle.max_words, 3);
        assert_eq!(config.subtitle.timing, SlotTiming::Fixed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [language]
            learn = "fr"
            native = "en"

            [subtitle]
            threshold_secs = 2.5
            timing = "proportional"
            extra_vowels = "àèù"
            "#,
        )
        .unwrap();

        assert_eq!(config.language.learn, "fr");
        assert_eq!(config.subtitle.threshold_secs, 2.5);
        assert_eq!(config.subtitle.max_words, 3);
        assert_eq!(config.subtitle.timing, SlotTiming::Proportional);
        assert_eq!(config.pool.backend, PoolBackend::File);
        assert_eq!(config.media.binary_path, "ffmpeg");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.oracle.mode = OracleMode::Dictionary;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.oracle.mode, OracleMode::Dictionary);
        assert_eq!(loaded.llm.model, config.llm.model);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = Config::default();
        config.subtitle.threshold_secs = 0.0;
        assert!(matches!(config.validate(), Err(LingoError::Config(_))));
    }

    #[test]
    fn test_validate_requires_blob_url() {
        let mut config = Config::default();
        config.pool.backend = PoolBackend::Blob;
        assert!(config.validate().is_err());
        config.pool.blob_url = Some("https://bucket.example/words.txt".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_secret_missing() {
        let result = resolve_secret("LINGOSHORT_TEST_SURELY_UNSET_VARIABLE");
        assert!(matches!(result, Err(LingoError::Config(_))));
    }
}
