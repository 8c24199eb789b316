// Media processing over ffmpeg/ffprobe
//
// - Processor: composes the short video and probes media durations
// - Commands: command builders over the two binaries

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Inputs and output of one video composition
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionJob {
    /// Still images shown in order, each for an equal share of the audio
    pub images: Vec<PathBuf>,
    pub audio: PathBuf,
    /// SubRip captions burned into the picture
    pub subtitles: PathBuf,
    pub output: PathBuf,
    pub duration_secs: f64,
}

impl CompositionJob {
    /// Seconds each image stays on screen
    pub fn slot_secs(&self) -> f64 {
        if self.images.is_empty() {
            return self.duration_secs;
        }
        self.duration_secs / self.images.len() as f64
    }

    /// Path the encoder writes to before the result is renamed to `output`.
    /// Stays in the same directory and keeps the extension.
    pub fn partial_output(&self) -> PathBuf {
        let stem = self
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let name = match self.output.extension() {
            Some(ext) => format!("{}.partial.{}", stem, ext.to_string_lossy()),
            None => format!("{}.partial", stem),
        };
        self.output.with_file_name(name)
    }
}

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Encode stills, narration and captions into one video file
    async fn compose_video(&self, job: &CompositionJob) -> Result<()>;

    /// Duration of an audio or video file in seconds
    async fn probe_duration(&self, media_path: &Path) -> Result<f64>;

    /// Check if the media tools are available
    fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
