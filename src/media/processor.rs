use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::MediaConfig;
use crate::error::{Result, LingoError};
use super::{CompositionJob, MediaCommandBuilder, MediaProcessorTrait};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path, &config.probe_path);

        Self {
            config,
            command_builder,
        }
    }
}

async fn discard_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
    }
}

/// Parse ffprobe's bare duration output
pub fn parse_duration(output: &str) -> Result<f64> {
    let value = output.lines().next().unwrap_or("").trim();
    let duration: f64 = value
        .parse()
        .map_err(|_| LingoError::Media(format!("Unexpected duration output: '{}'", value)))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(LingoError::Media(format!("Invalid media duration: {}", duration)));
    }
    Ok(duration)
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn compose_video(&self, job: &CompositionJob) -> Result<()> {
        if job.images.is_empty() {
            return Err(LingoError::Media("No images to compose".to_string()));
        }
        for input in job.images.iter().chain([&job.audio, &job.subtitles]) {
            if !input.exists() {
                return Err(LingoError::FileNotFound(input.display().to_string()));
            }
        }

        info!(
            "Composing {} image(s), {} and {} -> {}",
            job.images.len(),
            job.audio.display(),
            job.subtitles.display(),
            job.output.display()
        );

        // Encode next to the target and only rename a finished file into place
        let partial = job.partial_output();
        let staged = CompositionJob {
            output: partial.clone(),
            ..job.clone()
        };

        let command = self.command_builder.compose_video(&staged, &self.config);
        if let Err(e) = command.execute().await {
            discard_partial(&partial).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&partial, &job.output).await {
            discard_partial(&partial).await;
            return Err(e.into());
        }

        info!("Video composition completed successfully");
        Ok(())
    }

    async fn probe_duration(&self, media_path: &Path) -> Result<f64> {
        if !media_path.exists() {
            return Err(LingoError::FileNotFound(media_path.display().to_string()));
        }

        let output = self
            .command_builder
            .probe_duration(media_path)
            .execute_capture()
            .await?;
        let duration = parse_duration(&output)?;

        debug!("{} lasts {:.3}s", media_path.display(), duration);
        Ok(duration)
    }

    fn check_availability(&self) -> Result<()> {
        for binary in [&self.config.binary_path, &self.config.probe_path] {
            let output = Command::new(binary)
                .arg("-version")
                .output()
                .map_err(|e| LingoError::Media(format!("{} not found: {}", binary, e)))?;

            if !output.status.success() {
                return Err(LingoError::Media(format!("{} version check failed", binary)));
            }
        }

        info!("Media processor is available");
        Ok(())
    }

    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let output = self.command_builder.version_check().execute_capture().await?;
        // The first line carries the version
        let first_line = output.lines().next().unwrap_or("Unknown version");
        Ok(first_line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("9.000000\n").unwrap(), 9.0);
        assert_eq!(parse_duration("  2.5").unwrap(), 2.5);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(matches!(parse_duration("N/A"), Err(LingoError::Media(_))));
        assert!(matches!(parse_duration(""), Err(LingoError::Media(_))));
        assert!(matches!(parse_duration("0.0"), Err(LingoError::Media(_))));
        assert!(matches!(parse_duration("-1"), Err(LingoError::Media(_))));
    }

    #[tokio::test]
    async fn test_compose_requires_existing_inputs() {
        let processor = MediaProcessorImpl::new(MediaConfig::default());
        let job = CompositionJob {
            images: vec![PathBuf::from("/nonexistent/image-1.png")],
            audio: PathBuf::from("/nonexistent/speech.wav"),
            subtitles: PathBuf::from("/nonexistent/captions.srt"),
            output: PathBuf::from("/nonexistent/video.mp4"),
            duration_secs: 3.0,
        };

        let result = processor.compose_video(&job).await;
        assert!(matches!(result, Err(LingoError::FileNotFound(_))));
    }

    /// Inputs on disk plus a stand-in encoder that writes its last argument
    /// and exits with `status`
    #[cfg(unix)]
    fn staged_job(temp: &assert_fs::TempDir, status: i32) -> (MediaProcessorImpl, CompositionJob) {
        use assert_fs::prelude::*;
        use std::os::unix::fs::PermissionsExt;

        for name in ["image-1.png", "speech.wav", "captions.srt"] {
            temp.child(name).write_str("x").unwrap();
        }

        let encoder = temp.child("fake-ffmpeg");
        encoder
            .write_str(&format!(
                "#!/bin/sh\nfor last; do :; done\nprintf encoded > \"$last\"\nexit {}\n",
                status
            ))
            .unwrap();
        std::fs::set_permissions(encoder.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = MediaConfig {
            binary_path: encoder.path().to_string_lossy().to_string(),
            ..MediaConfig::default()
        };
        let job = CompositionJob {
            images: vec![temp.path().join("image-1.png")],
            audio: temp.path().join("speech.wav"),
            subtitles: temp.path().join("captions.srt"),
            output: temp.path().join("video.mp4"),
            duration_secs: 3.0,
        };
        (MediaProcessorImpl::new(config), job)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_encode_leaves_no_video() {
        let temp = assert_fs::TempDir::new().unwrap();
        let (processor, job) = staged_job(&temp, 1);

        let result = processor.compose_video(&job).await;
        assert!(matches!(result, Err(LingoError::Media(_))));
        assert!(!job.output.exists());
        assert!(!job.partial_output().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_encode_moves_video_into_place() {
        let temp = assert_fs::TempDir::new().unwrap();
        let (processor, job) = staged_job(&temp, 0);

        processor.compose_video(&job).await.unwrap();
        assert_eq!(std::fs::read_to_string(&job.output).unwrap(), "encoded");
        assert!(!job.partial_output().exists());
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let processor = MediaProcessorImpl::new(MediaConfig::default());
        let result = processor.probe_duration(Path::new("/nonexistent/speech.wav")).await;
        assert!(matches!(result, Err(LingoError::FileNotFound(_))));
    }
}
