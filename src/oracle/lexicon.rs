use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use super::WordOracle;
use crate::error::{Result, LingoError};

/// Oracle backed by a local list of known words, one per line
pub struct LexiconOracle {
    language: String,
    words: HashSet<String>,
}

impl LexiconOracle {
    pub fn from_words<I, S>(language: &str, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty() && !w.starts_with('#'))
            .collect();

        Self {
            language: language.to_string(),
            words,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, language: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LingoError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let oracle = Self::from_words(language, content.lines());
        info!(
            "Loaded {} {} lexicon entries from {}",
            oracle.len(),
            language,
            path.display()
        );
        Ok(oracle)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[async_trait]
impl WordOracle for LexiconOracle {
    async fn is_real(&self, word: &str, language: &str) -> Result<bool> {
        if !language.eq_ignore_ascii_case(&self.language) {
            return Err(LingoError::Config(format!(
                "lexicon covers '{}', not '{}'",
                self.language, language
            )));
        }

        Ok(self.words.contains(&word.trim().to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    #[tokio::test]
    async fn test_membership_is_case_insensitive() {
        let oracle = LexiconOracle::from_words("es", ["gato", "Perro", "  árbol "]);

        assert!(oracle.is_real("gato", "es").await.unwrap());
        assert!(oracle.is_real("GATO", "es").await.unwrap());
        assert!(oracle.is_real("perro", "es").await.unwrap());
        assert!(oracle.is_real("Árbol", "es").await.unwrap());
        assert!(!oracle.is_real("xyzzy", "es").await.unwrap());
    }

    #[tokio::test]
    async fn test_other_language_is_a_config_error() {
        let oracle = LexiconOracle::from_words("es", ["gato"]);
        let result = oracle.is_real("gato", "fr").await;
        assert!(matches!(result, Err(LingoError::Config(_))));
    }

    #[tokio::test]
    async fn test_from_file_skips_blank_and_comment_lines() {
        let temp = TempDir::new().unwrap();
        let file = temp.child("lexicon.txt");
        file.write_str("# spanish\ngato\n\nperro\n").unwrap();

        let oracle = LexiconOracle::from_file(file.path(), "es").unwrap();
        assert_eq!(oracle.len(), 2);
        assert!(oracle.is_real("perro", "es").await.unwrap());
    }

    #[test]
    fn test_from_file_missing() {
        let result = LexiconOracle::from_file("/nonexistent/lexicon.txt", "es");
        assert!(matches!(result, Err(LingoError::FileNotFound(_))));
    }
}
