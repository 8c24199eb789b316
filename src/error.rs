use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Error, Debug)]
pub enum LingoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Word pool exhausted: no candidate words remain")]
    PoolExhausted,

    #[error("Word oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Degenerate segmentation input: {0}")]
    DegenerateInput(String),

    #[error("Malformed word pool: {0}")]
    MalformedPool(String),

    #[error("Word pool was modified concurrently (expected version {expected}, found {found})")]
    PoolConflict { expected: String, found: String },

    #[error("Pool storage error: {0}")]
    Storage(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Image generation error: {0}")]
    Image(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<LingoError>,
    },
}

impl LingoError {
    /// Whether the same operation may succeed if attempted again unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::OracleUnavailable(_) | Self::PoolConflict { .. } => true,
            Self::Stage { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// The pipeline stage an error was raised in, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LingoError>;
