use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::{CatalogFactory, MetadataStore, UpsertOutcome, VideoRecord};
use crate::config::Config;
use crate::error::{Result, LingoError};
use crate::image::{ImageGenerator, OpenAiImageGenerator};
use crate::media::{CompositionJob, MediaProcessorFactory, MediaProcessorTrait};
use crate::metadata::VideoMetadata;
use crate::oracle::OracleFactory;
use crate::sentence::{LlmSentenceGenerator, SentenceGenerator};
use crate::speech::{OpenAiSpeechSynthesizer, SpeechArtifact, SpeechSynthesizer};
use crate::subtitle::{write_srt, CaptionGroup, SubtitleSegmenter};
use crate::translate::{language_name, LlmTranslator, Translator};
use crate::upload::{UploadReceipt, VideoUploader, YouTubeUploader};
use crate::words::{PoolStoreFactory, VerifiedWord, WordSelector};

pub const SPEECH_FILE: &str = "speech.wav";
pub const CAPTIONS_FILE: &str = "captions.srt";
pub const VIDEO_FILE: &str = "video.mp4";
pub const REPORT_FILE: &str = "report.json";

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    SelectWord,
    GenerateSentence,
    Translate,
    SynthesizeSpeech,
    SegmentSubtitles,
    GenerateImages,
    ComposeVideo,
    Upload,
    PersistMetadata,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::SelectWord,
        Stage::GenerateSentence,
        Stage::Translate,
        Stage::SynthesizeSpeech,
        Stage::SegmentSubtitles,
        Stage::GenerateImages,
        Stage::ComposeVideo,
        Stage::Upload,
        Stage::PersistMetadata,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::SelectWord => "word selection",
            Stage::GenerateSentence => "sentence generation",
            Stage::Translate => "translation",
            Stage::SynthesizeSpeech => "speech synthesis",
            Stage::SegmentSubtitles => "subtitle segmentation",
            Stage::GenerateImages => "image generation",
            Stage::ComposeVideo => "video composition",
            Stage::Upload => "upload",
            Stage::PersistMetadata => "metadata persistence",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn failed_in(stage: Stage) -> impl FnOnce(LingoError) -> LingoError {
    move |source| LingoError::Stage {
        stage,
        source: Box::new(source),
    }
}

/// Everything one successful run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub word: VerifiedWord,
    pub sentence: String,
    pub translation: String,
    pub audio: SpeechArtifact,
    pub captions: Vec<CaptionGroup>,
    pub subtitles: PathBuf,
    pub images: Vec<PathBuf>,
    pub video: PathBuf,
    pub metadata: VideoMetadata,
    pub upload: UploadReceipt,
    pub catalog: UpsertOutcome,
}

/// Collaborators a pipeline runs against
pub struct PipelineParts {
    pub selector: WordSelector,
    pub sentences: Box<dyn SentenceGenerator>,
    pub translator: Box<dyn Translator>,
    pub speech: Box<dyn SpeechSynthesizer>,
    pub images: Box<dyn ImageGenerator>,
    pub media: Box<dyn MediaProcessorTrait>,
    pub uploader: Box<dyn VideoUploader>,
    pub catalog: Box<dyn MetadataStore>,
}

/// Word-of-the-day pipeline: one verified word in, one published video out
pub struct Pipeline {
    config: Config,
    segmenter: SubtitleSegmenter,
    parts: PipelineParts,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    /// Build a pipeline wired to the configured services
    pub fn new(config: Config) -> Result<Self> {
        let store = PoolStoreFactory::create(&config.pool)?;
        let oracle = OracleFactory::create(&config.oracle, &config.language.learn)?;
        let media = MediaProcessorFactory::create_processor(config.media.clone());

        // Check dependencies
        media.check_availability()?;

        let parts = PipelineParts {
            selector: WordSelector::new(store, oracle, config.language.learn.clone()),
            sentences: Box::new(LlmSentenceGenerator::from_config(&config.llm)?),
            translator: Box::new(LlmTranslator::from_config(&config.llm)?),
            speech: Box::new(OpenAiSpeechSynthesizer::from_config(&config.speech, &config.media)?),
            images: Box::new(OpenAiImageGenerator::from_config(&config.image)?),
            media,
            uploader: Box::new(YouTubeUploader::from_config(&config.upload)?),
            catalog: CatalogFactory::create(&config.catalog)?,
        };

        Ok(Self::from_parts(config, parts))
    }

    pub fn from_parts(config: Config, parts: PipelineParts) -> Self {
        let segmenter = SubtitleSegmenter::from_config(&config.subtitle);
        Self {
            config,
            segmenter,
            parts,
            progress: None,
        }
    }

    /// Show a stage progress bar while running
    pub fn with_progress(mut self) -> Self {
        let bar = ProgressBar::new(Stage::ALL.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}") {
            bar.set_style(style.progress_chars("#>-"));
        }
        self.progress = Some(bar);
        self
    }

    fn enter(&self, stage: Stage) {
        info!("Stage: {}", stage);
        if let Some(bar) = &self.progress {
            bar.set_message(stage.name());
        }
    }

    fn leave(&self) {
        if let Some(bar) = &self.progress {
            bar.inc(1);
        }
    }

    fn finish(&self, message: &'static str) {
        if let Some(bar) = &self.progress {
            bar.finish_with_message(message);
        }
    }

    /// Run every stage once, in order. The first failure aborts the run and
    /// is reported as `LingoError::Stage`; a consumed word stays consumed.
    pub async fn run(&mut self) -> Result<RunReport> {
        let result = self.run_stages().await;
        match &result {
            Ok(_) => self.finish("done"),
            Err(_) => self.finish("failed"),
        }
        result
    }

    async fn run_stages(&mut self) -> Result<RunReport> {
        let learn = self.config.language.learn.clone();
        let native = self.config.language.native.clone();
        let run_id = Uuid::new_v4().to_string();
        let run_dir = self.config.paths.work_dir.join(&run_id);
        info!("Starting run {} ({} -> {})", run_id, learn, native);

        self.enter(Stage::SelectWord);
        let word = self
            .parts
            .selector
            .select_word()
            .await
            .map_err(failed_in(Stage::SelectWord))?;
        self.leave();

        self.enter(Stage::GenerateSentence);
        let sentence = self
            .parts
            .sentences
            .generate(&word)
            .await
            .map_err(failed_in(Stage::GenerateSentence))?;
        self.leave();

        self.enter(Stage::Translate);
        let translation = self
            .parts
            .translator
            .translate(&sentence, &learn, &native)
            .await
            .map_err(failed_in(Stage::Translate))?;
        self.leave();

        self.enter(Stage::SynthesizeSpeech);
        let audio = self
            .synthesize(&sentence, &learn, &run_dir)
            .await
            .map_err(failed_in(Stage::SynthesizeSpeech))?;
        self.leave();

        self.enter(Stage::SegmentSubtitles);
        let subtitles = run_dir.join(CAPTIONS_FILE);
        let captions = self
            .caption(&sentence, audio.duration_secs, &subtitles)
            .await
            .map_err(failed_in(Stage::SegmentSubtitles))?;
        self.leave();

        self.enter(Stage::GenerateImages);
        let images = self
            .illustrate(&sentence, &learn, &run_dir)
            .await
            .map_err(failed_in(Stage::GenerateImages))?;
        self.leave();

        self.enter(Stage::ComposeVideo);
        let video = run_dir.join(VIDEO_FILE);
        let job = CompositionJob {
            images: images.clone(),
            audio: audio.path.clone(),
            subtitles: subtitles.clone(),
            output: video.clone(),
            duration_secs: audio.duration_secs,
        };
        self.parts
            .media
            .compose_video(&job)
            .await
            .map_err(failed_in(Stage::ComposeVideo))?;
        self.leave();

        self.enter(Stage::Upload);
        let metadata = VideoMetadata::for_word(
            &word.text,
            &sentence,
            &translation,
            &learn,
            &self.config.upload.category_id,
        );
        let upload = self
            .parts
            .uploader
            .upload(&video, &metadata)
            .await
            .map_err(failed_in(Stage::Upload))?;
        self.leave();

        self.enter(Stage::PersistMetadata);
        let record = VideoRecord {
            video_id: upload.video_id.clone(),
            word: Some(word.text.clone()),
            sentence: Some(sentence.clone()),
            translated_sentence: Some(translation.clone()),
            title: Some(metadata.title.clone()),
            description: Some(metadata.description.clone()),
            upload_time: Some(Utc::now()),
            thumbnail_url: Some(upload.thumbnail_url.clone()),
        };
        let catalog = self
            .parts
            .catalog
            .upsert(&record)
            .await
            .map_err(failed_in(Stage::PersistMetadata))?;

        let report = RunReport {
            run_id,
            run_dir: run_dir.clone(),
            word,
            sentence,
            translation,
            audio,
            captions,
            subtitles,
            images,
            video,
            metadata,
            upload,
            catalog,
        };
        self.leave();

        // The record is already in the catalog, so a missing report does not fail the run
        let report_path = run_dir.join(REPORT_FILE);
        if let Err(e) = write_report(&report, &report_path).await {
            warn!("Failed to write run report {}: {}", report_path.display(), e);
        }

        info!(
            "Published '{}' as {} ({:?} in catalog)",
            report.word.text, report.upload.video_id, report.catalog
        );
        Ok(report)
    }

    async fn synthesize(&self, sentence: &str, language: &str, run_dir: &Path) -> Result<SpeechArtifact> {
        fs::create_dir_all(run_dir).await?;
        let audio = self
            .parts
            .speech
            .synthesize(sentence, language, &run_dir.join(SPEECH_FILE))
            .await?;

        if !audio.duration_secs.is_finite() || audio.duration_secs <= 0.0 {
            return Err(LingoError::Speech(format!(
                "Synthesized audio has invalid duration {}",
                audio.duration_secs
            )));
        }
        Ok(audio)
    }

    async fn caption(&self, sentence: &str, duration: f64, path: &Path) -> Result<Vec<CaptionGroup>> {
        let captions = self.segmenter.segment(sentence, duration)?;
        write_srt(&captions, path).await?;
        Ok(captions)
    }

    async fn illustrate(&self, sentence: &str, language: &str, run_dir: &Path) -> Result<Vec<PathBuf>> {
        let prompt = image_prompt(sentence, language);
        let images = self
            .parts
            .images
            .generate(&prompt, self.config.image.count, run_dir)
            .await?;

        if images.is_empty() {
            return Err(LingoError::Image("No images were generated".to_string()));
        }
        Ok(images)
    }
}

pub fn image_prompt(sentence: &str, language: &str) -> String {
    format!(
        "Generate an image to match the following {} sentence: {}",
        language_name(language),
        sentence
    )
}

async fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).await?;
    Ok(())
}
