//! Lingoshort - Language-learning shorts generator
//!
//! Selects a verified word from a shrinking pool, generates and translates an
//! example sentence, narrates it, captions it with syllable-timed subtitles,
//! illustrates it, composes a short video with ffmpeg, uploads it and records
//! its metadata in a catalog.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod llm;
pub mod media;
pub mod metadata;
pub mod oracle;
pub mod pipeline;
pub mod sentence;
pub mod speech;
pub mod subtitle;
pub mod syllable;
pub mod translate;
pub mod upload;
pub mod words;
