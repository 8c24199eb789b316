use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::config::MediaConfig;
use crate::error::{Result, LingoError};
use super::CompositionJob;

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add a still image input repeated for `seconds`
    pub fn still_input<P: AsRef<Path>>(self, path: P, seconds: f64) -> Self {
        self.arg("-loop")
            .arg("1")
            .arg("-t")
            .arg(format!("{:.3}", seconds))
            .input(path)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Set a complex filter graph
    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    /// Map a stream or filter label into the output
    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    /// Set output frame rate
    pub fn frame_rate(self, fps: u32) -> Self {
        self.arg("-r").arg(fps.to_string())
    }

    /// Set output pixel format
    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    fn run(&self) -> Result<std::process::Output> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .map_err(|e| LingoError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LingoError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(output)
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        self.run().map(|_| ())
    }

    /// Execute the command and return its standard output
    pub async fn execute_capture(&self) -> Result<String> {
        let output = self.run()?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Escape a path for use as a filter option value
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Builder for the media operations the pipeline needs
pub struct MediaCommandBuilder {
    binary_path: String,
    probe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, probe_path: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            probe_path: probe_path.into(),
        }
    }

    /// Build the composition command: stills split evenly over the narration,
    /// scaled and cropped to the frame, captions burned in at the bottom.
    pub fn compose_video(&self, job: &CompositionJob, config: &MediaConfig) -> MediaCommand {
        let slot = job.slot_secs();
        let mut cmd = MediaCommand::new(&self.binary_path, "Video composition").overwrite();

        for image in &job.images {
            cmd = cmd.still_input(image, slot);
        }
        cmd = cmd.input(&job.audio);

        let mut graph = String::new();
        for index in 0..job.images.len() {
            graph.push_str(&format!(
                "[{index}:v]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1[v{index}];",
                index = index,
                w = config.width,
                h = config.height,
            ));
        }
        for index in 0..job.images.len() {
            graph.push_str(&format!("[v{}]", index));
        }
        graph.push_str(&format!(
            "concat=n={}:v=1:a=0,fps={},format=yuv420p,subtitles='{}':force_style='Alignment=2,MarginV=120'[v]",
            job.images.len(),
            config.fps,
            escape_filter_path(&job.subtitles),
        ));

        cmd = cmd
            .filter_complex(graph)
            .map("[v]")
            .map(format!("{}:a", job.images.len()))
            .video_codec("libx264")
            .audio_codec("aac")
            .pixel_format("yuv420p")
            .frame_rate(config.fps)
            .arg("-shortest");

        for option in &config.encode_options {
            cmd = cmd.arg(option);
        }

        cmd.output(&job.output)
    }

    /// Build the duration probe command
    pub fn probe_duration<P: AsRef<Path>>(&self, media_path: P) -> MediaCommand {
        MediaCommand::new(&self.probe_path, "Duration probe")
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .output(media_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job(images: usize) -> CompositionJob {
        CompositionJob {
            images: (1..=images).map(|i| PathBuf::from(format!("run/image-{}.png", i))).collect(),
            audio: PathBuf::from("run/speech.wav"),
            subtitles: PathBuf::from("run/captions.srt"),
            output: PathBuf::from("run/video.mp4"),
            duration_secs: 9.0,
        }
    }

    fn arg_after<'a>(cmd: &'a MediaCommand, flag: &str) -> Vec<&'a str> {
        cmd.args
            .windows(2)
            .filter(|pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
            .collect()
    }

    #[test]
    fn test_compose_splits_images_over_duration() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.compose_video(&job(3), &MediaConfig::default());

        assert_eq!(cmd.binary_path, "ffmpeg");
        assert_eq!(arg_after(&cmd, "-t"), vec!["3.000", "3.000", "3.000"]);
        assert_eq!(
            arg_after(&cmd, "-i"),
            vec!["run/image-1.png", "run/image-2.png", "run/image-3.png", "run/speech.wav"]
        );
        assert_eq!(arg_after(&cmd, "-map"), vec!["[v]", "3:a"]);
        assert_eq!(cmd.args.last().map(String::as_str), Some("run/video.mp4"));
    }

    #[test]
    fn test_compose_filter_graph() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.compose_video(&job(1), &MediaConfig::default());
        let graph = arg_after(&cmd, "-filter_complex");

        assert_eq!(graph.len(), 1);
        assert!(graph[0].starts_with("[0:v]scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920"));
        assert!(graph[0].contains("[v0]concat=n=1:v=1:a=0,fps=24,format=yuv420p"));
        assert!(graph[0].contains("subtitles='run/captions.srt'"));
        assert!(graph[0].ends_with("[v]"));
        assert_eq!(arg_after(&cmd, "-c:v"), vec!["libx264"]);
        assert_eq!(arg_after(&cmd, "-c:a"), vec!["aac"]);
    }

    #[test]
    fn test_probe_duration_command() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.probe_duration("speech.wav");

        assert_eq!(cmd.binary_path, "ffprobe");
        assert_eq!(
            cmd.args,
            vec![
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
                "speech.wav"
            ]
        );
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path(Path::new("C:\\run\\it's.srt")), "C\\:/run/it\\'s.srt");
    }

    #[test]
    fn test_partial_output_keeps_extension() {
        assert_eq!(job(1).partial_output(), PathBuf::from("run/video.partial.mp4"));
    }

    #[test]
    fn test_slot_secs() {
        assert_eq!(job(3).slot_secs(), 3.0);
        assert_eq!(job(0).slot_secs(), 9.0);
    }
}
