// Word verification oracles
//
// An oracle answers whether a string is a real word of a language:
// - Lexicon: membership in a local word list
// - Dictionary: a hosted dictionary search API
//
// A definitive `false` is different from a failure. Oracles report a
// transient failure to reach a verdict as `OracleUnavailable` and a
// misconfiguration as `Config`.

pub mod dictionary;
pub mod lexicon;

use async_trait::async_trait;

pub use dictionary::DictionaryOracle;
pub use lexicon::LexiconOracle;
use crate::config::{OracleConfig, OracleMode};
use crate::error::Result;

/// Decides whether a word is real in a language
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WordOracle: Send + Sync {
    async fn is_real(&self, word: &str, language: &str) -> Result<bool>;
}

/// Factory for creating oracle instances
pub struct OracleFactory;

impl OracleFactory {
    /// Create an oracle for the configured mode
    pub fn create(config: &OracleConfig, language: &str) -> Result<Box<dyn WordOracle>> {
        match config.mode {
            OracleMode::Lexicon => Ok(Box::new(LexiconOracle::from_file(
                &config.lexicon_path,
                language,
            )?)),
            OracleMode::Dictionary => Ok(Box::new(DictionaryOracle::from_config(config)?)),
        }
    }
}
