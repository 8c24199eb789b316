//! Lingoshort - Language-learning shorts generator
//!
//! Picks a verified word of the day, builds a narrated, captioned short video
//! around an example sentence and publishes it together with its metadata.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lingoshort::catalog::api::{self, ApiState};
use lingoshort::catalog::{CatalogFactory, MetadataStore};
use lingoshort::cli::{Args, Commands, PoolAction};
use lingoshort::config::{Config, PoolBackend, SlotTiming};
use lingoshort::error::LingoError;
use lingoshort::llm::OllamaClient;
use lingoshort::oracle::OracleFactory;
use lingoshort::pipeline::Pipeline;
use lingoshort::subtitle::{render_srt, write_srt, SubtitleSegmenter};
use lingoshort::syllable::SyllableEstimator;
use lingoshort::words::{PoolStore, PoolStoreFactory, WordSelector};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Secrets may live in a .env file
    dotenv::dotenv().ok();

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Run { no_progress } => {
            info!("Starting word-of-the-day run");

            OllamaClient::new(&config.llm)?.check_availability().await?;

            let mut pipeline = Pipeline::new(config)?;
            if !no_progress {
                pipeline = pipeline.with_progress();
            }

            let report = pipeline.run().await?;
            println!("Word:        {}", report.word.text);
            println!("Sentence:    {}", report.sentence);
            println!("Translation: {}", report.translation);
            println!("Video:       {}", report.video.display());
            println!("Video ID:    {}", report.upload.video_id);
            println!("Catalog:     {:?}", report.catalog);
        }
        Commands::SelectWord { pool } => {
            if let Some(path) = pool {
                config.pool.backend = PoolBackend::File;
                config.pool.path = path;
            }

            let store = PoolStoreFactory::create(&config.pool)?;
            let oracle = OracleFactory::create(&config.oracle, &config.language.learn)?;
            let mut selector = WordSelector::new(store, oracle, config.language.learn.clone());

            let word = selector.select_word().await?;
            println!("{}", word.text);
            info!("{} words left in the pool", selector.remaining().await?);
        }
        Commands::Segment { sentence, duration, output, threshold, proportional } => {
            if let Some(threshold) = threshold {
                config.subtitle.threshold_secs = threshold;
            }
            if proportional {
                config.subtitle.timing = SlotTiming::Proportional;
            }
            config.validate()?;

            let segmenter = SubtitleSegmenter::from_config(&config.subtitle);
            let groups = segmenter.segment(&sentence, duration)?;

            match output {
                Some(path) => {
                    write_srt(&groups, &path).await?;
                    println!("Wrote {} caption groups to {}", groups.len(), path.display());
                }
                None => print!("{}", render_srt(&groups)),
            }
        }
        Commands::Syllables { words } => {
            let estimator = SyllableEstimator::with_extra_vowels(&config.subtitle.extra_vowels);
            for word in &words {
                println!("{:<20} {}", word, estimator.count(word));
            }
        }
        Commands::Pool { action } => match action {
            PoolAction::Check { pool } => {
                if let Some(path) = pool {
                    config.pool.backend = PoolBackend::File;
                    config.pool.path = path;
                }

                let store = PoolStoreFactory::create(&config.pool)?;
                let snapshot = store.read().await?;
                println!("Pool:    {}", store.describe());
                println!("Words:   {}", snapshot.words.len());
                println!("Version: {}", snapshot.version);
            }
        },
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.catalog.bind.clone());
            let store: Arc<dyn MetadataStore> = Arc::from(CatalogFactory::create(&config.catalog)?);

            let api_key = std::env::var(&config.catalog.api_key_env).ok();
            if api_key.is_none() {
                warn!(
                    "{} is not set; write and delete requests will be refused",
                    config.catalog.api_key_env
                );
            }

            api::serve(&bind, ApiState::new(store, api_key)).await?;
        }
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                return Err(LingoError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    output.display()
                ))
                .into());
            }

            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".lingoshort").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "lingoshort.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so command output stays pipeable
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("lingoshort.log").display()
    );

    Ok(())
}
