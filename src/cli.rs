use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline: pick a word, build the short and publish it
    Run {
        /// Do not draw a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Draw and verify one word from the pool (the word is consumed)
    SelectWord {
        /// Pool file, overriding the configured pool
        #[arg(short, long)]
        pool: Option<PathBuf>,
    },

    /// Split a sentence into timed caption groups and print them as SRT
    Segment {
        /// Sentence to segment
        sentence: String,

        /// Length of the spoken sentence in seconds
        #[arg(short, long, allow_negative_numbers = true)]
        duration: f64,

        /// Write the SRT to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds per caption slot
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Time groups by their spoken length instead of fixed slots
        #[arg(long)]
        proportional: bool,
    },

    /// Print estimated syllable counts
    Syllables {
        /// Words to count
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Inspect the word pool
    Pool {
        #[command(subcommand)]
        action: PoolAction,
    },

    /// Serve the video catalog API
    Serve {
        /// Address to listen on, overriding the configured one
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Write a configuration file with default settings
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum PoolAction {
    /// Validate the pool and report how many words remain
    Check {
        /// Pool file, overriding the configured pool
        #[arg(short, long)]
        pool: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segment() {
        let args = Args::parse_from(["lingoshort", "segment", "el perro corre", "-d", "9.0", "--proportional"]);
        match args.command {
            Commands::Segment { sentence, duration, proportional, threshold, .. } => {
                assert_eq!(sentence, "el perro corre");
                assert_eq!(duration, 9.0);
                assert!(proportional);
                assert!(threshold.is_none());
            }
            _ => panic!("expected segment command"),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let args = Args::parse_from(["lingoshort", "-v", "-c", "custom.toml", "pool", "check"]);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(args.command, Commands::Pool { action: PoolAction::Check { pool: None } }));
    }

    #[test]
    fn test_syllables_requires_words() {
        assert!(Args::try_parse_from(["lingoshort", "syllables"]).is_err());
    }
}
