// Word selection over a persistent, shrinking pool
//
// - Store: where the pool lives (local file, remote blob, memory)
// - WordSelector: draws words at random and keeps only oracle-verified ones
//
// Every draw that gets a definitive verdict removes the word and persists the
// pool before the next draw. A draw whose oracle call fails leaves the pool
// untouched so the same draw can be retried.

pub mod store;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

pub use store::*;
use crate::config::{PoolBackend, PoolConfig};
use crate::error::{Result, LingoError};
use crate::oracle::WordOracle;

/// Opaque token identifying one stored state of the pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolVersion(pub String);

impl fmt::Display for PoolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pool contents together with the version they were read at
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub words: Vec<String>,
    pub version: PoolVersion,
}

/// A word the oracle confirmed as real
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedWord {
    pub text: String,
    pub language: String,
}

/// Storage capability for the word pool
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Load and validate the current pool
    async fn read(&self) -> Result<PoolSnapshot>;

    /// Replace the pool, provided it is still at `expected`. Returns the new version.
    async fn write(&self, words: &[String], expected: &PoolVersion) -> Result<PoolVersion>;

    /// Human-readable location used in logs
    fn describe(&self) -> String;
}

/// Factory for creating pool stores
pub struct PoolStoreFactory;

impl PoolStoreFactory {
    pub fn create(config: &PoolConfig) -> Result<Box<dyn PoolStore>> {
        match config.backend {
            PoolBackend::File => Ok(Box::new(FilePoolStore::new(&config.path))),
            PoolBackend::Blob => {
                let url = config.blob_url.clone().ok_or_else(|| {
                    LingoError::Config("pool.blob_url is required for the blob backend".to_string())
                })?;
                let token = match &config.blob_token_env {
                    Some(env_name) => Some(crate::config::resolve_secret(env_name)?),
                    None => None,
                };
                Ok(Box::new(BlobPoolStore::new(url, token)?))
            }
        }
    }
}

/// Parse newline-separated pool text, rejecting empty and duplicate entries
pub fn parse_pool(text: &str) -> Result<Vec<String>> {
    let text = text.trim_end();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let mut words = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let word = line.trim();
        if word.is_empty() {
            return Err(LingoError::MalformedPool(format!("empty entry at line {}", index + 1)));
        }
        if !seen.insert(word.to_string()) {
            return Err(LingoError::MalformedPool(format!(
                "duplicate entry '{}' at line {}",
                word,
                index + 1
            )));
        }
        words.push(word.to_string());
    }

    Ok(words)
}

/// Serialize pool words back to their newline-separated form
pub fn render_pool(words: &[String]) -> String {
    if words.is_empty() {
        return String::new();
    }
    let mut text = words.join("\n");
    text.push('\n');
    text
}

/// Draws random words from the pool until the oracle accepts one
pub struct WordSelector {
    store: Box<dyn PoolStore>,
    oracle: Box<dyn WordOracle>,
    language: String,
    rng: StdRng,
}

impl WordSelector {
    pub fn new<S: Into<String>>(
        store: Box<dyn PoolStore>,
        oracle: Box<dyn WordOracle>,
        language: S,
    ) -> Self {
        Self {
            store,
            oracle,
            language: language.into(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a specific random source, e.g. a seeded one for reproducible draws
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Number of words still in the pool
    pub async fn remaining(&self) -> Result<usize> {
        Ok(self.store.read().await?.words.len())
    }

    /// Select a verified word, consuming every word it tests.
    ///
    /// Returns `PoolExhausted` when no word is accepted before the pool runs
    /// out. When no verdict could be obtained the drawn word stays in the pool
    /// and the error is `Config` for a misconfigured oracle, otherwise
    /// `OracleUnavailable`.
    pub async fn select_word(&mut self) -> Result<VerifiedWord> {
        let PoolSnapshot { mut words, mut version } = self.store.read().await?;
        info!(
            "Selecting a {} word from {} ({} candidates)",
            self.language,
            self.store.describe(),
            words.len()
        );

        loop {
            if words.is_empty() {
                warn!("Word pool exhausted before a real word was found");
                return Err(LingoError::PoolExhausted);
            }

            let index = self.rng.gen_range(0..words.len());
            let candidate = words[index].clone();
            debug!("Drew candidate '{}'", candidate);

            let is_real = match self.oracle.is_real(&candidate, &self.language).await {
                Ok(verdict) => verdict,
                Err(e @ (LingoError::OracleUnavailable(_) | LingoError::Config(_))) => {
                    warn!("Could not verify '{}', leaving it in the pool: {}", candidate, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Could not verify '{}', leaving it in the pool: {}", candidate, e);
                    return Err(LingoError::OracleUnavailable(e.to_string()));
                }
            };

            words.remove(index);
            version = self.store.write(&words, &version).await?;

            if is_real {
                info!("Accepted '{}' ({} words left)", candidate, words.len());
                return Ok(VerifiedWord {
                    text: candidate,
                    language: self.language.clone(),
                });
            }

            info!("Rejected '{}' as not a real word ({} words left)", candidate, words.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockWordOracle;
    use std::collections::HashSet;

    fn pool(words: &[&str]) -> MemoryPoolStore {
        MemoryPoolStore::new(words.iter().map(|w| w.to_string()).collect())
    }

    fn rejecting(fake: &'static str) -> MockWordOracle {
        let mut oracle = MockWordOracle::new();
        oracle
            .expect_is_real()
            .returning(move |word, _| Ok(word != fake));
        oracle
    }

    #[test]
    fn test_parse_pool() {
        assert_eq!(parse_pool("gato\nperro\n").unwrap(), vec!["gato", "perro"]);
        assert_eq!(parse_pool("  gato \r\nperro").unwrap(), vec!["gato", "perro"]);
        assert!(parse_pool("").unwrap().is_empty());
        assert!(parse_pool("gato\n\n\n").is_ok());
    }

    #[test]
    fn test_parse_pool_rejects_malformed() {
        assert!(matches!(parse_pool("gato\n\nperro"), Err(LingoError::MalformedPool(_))));
        assert!(matches!(parse_pool("gato\nperro\ngato"), Err(LingoError::MalformedPool(_))));
    }

    #[test]
    fn test_render_pool() {
        let words = vec!["gato".to_string(), "perro".to_string()];
        assert_eq!(render_pool(&words), "gato\nperro\n");
        assert_eq!(parse_pool(&render_pool(&words)).unwrap(), words);
        assert_eq!(render_pool(&[]), "");
    }

    #[tokio::test]
    async fn test_never_returns_rejected_word_then_exhausts() {
        let store = pool(&["gato", "perro", "xyzzy"]);
        let handle = store.clone();
        let mut selector = WordSelector::new(Box::new(store), Box::new(rejecting("xyzzy")), "es")
            .with_rng(StdRng::seed_from_u64(7));

        let mut accepted = HashSet::new();
        loop {
            match selector.select_word().await {
                Ok(word) => {
                    assert_ne!(word.text, "xyzzy");
                    assert_eq!(word.language, "es");
                    assert!(accepted.insert(word.text), "word returned twice");
                }
                Err(LingoError::PoolExhausted) => break,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(accepted, HashSet::from(["gato".to_string(), "perro".to_string()]));
        assert!(handle.words().await.is_empty());
        assert!(matches!(selector.select_word().await, Err(LingoError::PoolExhausted)));
    }

    #[tokio::test]
    async fn test_each_call_shrinks_persisted_pool() {
        let store = pool(&["uno", "dos", "tres", "cuatro", "cinco"]);
        let handle = store.clone();
        let mut selector = WordSelector::new(Box::new(store), Box::new(rejecting("-")), "es")
            .with_rng(StdRng::seed_from_u64(1));

        let mut previous = handle.words().await.len();
        let mut seen = HashSet::new();
        for _ in 0..5 {
            let word = selector.select_word().await.unwrap();
            assert!(seen.insert(word.text.clone()));

            let remaining = handle.words().await;
            assert!(remaining.len() < previous);
            assert!(!remaining.contains(&word.text));
            previous = remaining.len();
        }
        assert_eq!(selector.remaining().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_oracle_outage_keeps_word() {
        let store = pool(&["gato"]);
        let handle = store.clone();

        let mut oracle = MockWordOracle::new();
        oracle
            .expect_is_real()
            .times(1)
            .returning(|_, _| Err(LingoError::OracleUnavailable("timeout".to_string())));

        let mut selector = WordSelector::new(Box::new(store), Box::new(oracle), "es");
        let result = selector.select_word().await;

        assert!(matches!(result, Err(LingoError::OracleUnavailable(_))));
        assert_eq!(handle.words().await, vec!["gato".to_string()]);
        assert_eq!(handle.writes().await, 0);
    }

    #[tokio::test]
    async fn test_other_oracle_errors_are_reported_as_unavailable() {
        let store = pool(&["gato"]);
        let handle = store.clone();

        let mut oracle = MockWordOracle::new();
        oracle
            .expect_is_real()
            .returning(|_, _| Err(LingoError::Llm("connection reset".to_string())));

        let mut selector = WordSelector::new(Box::new(store), Box::new(oracle), "es");
        let error = selector.select_word().await.unwrap_err();

        assert!(matches!(error, LingoError::OracleUnavailable(_)));
        assert!(error.is_retryable());
        assert_eq!(handle.words().await.len(), 1);
    }

    #[tokio::test]
    async fn test_misconfigured_oracle_is_not_retryable() {
        let store = pool(&["gato"]);
        let handle = store.clone();

        let mut oracle = MockWordOracle::new();
        oracle
            .expect_is_real()
            .returning(|_, _| Err(LingoError::Config("missing key".to_string())));

        let mut selector = WordSelector::new(Box::new(store), Box::new(oracle), "es");
        let error = selector.select_word().await.unwrap_err();

        assert!(matches!(error, LingoError::Config(_)));
        assert!(!error.is_retryable());
        assert_eq!(handle.words().await, vec!["gato".to_string()]);
        assert_eq!(handle.writes().await, 0);
    }

    #[tokio::test]
    async fn test_rejections_are_persisted_before_next_draw() {
        let store = pool(&["xyzzy", "gato"]);
        let handle = store.clone();
        let mut selector = WordSelector::new(Box::new(store), Box::new(rejecting("xyzzy")), "es")
            .with_rng(StdRng::seed_from_u64(3));

        let word = selector.select_word().await.unwrap();
        assert_eq!(word.text, "gato");
        assert!(handle.words().await.is_empty());
        // one write per tested word, whichever order they were drawn in
        let writes = handle.writes().await;
        assert!(writes == 1 || writes == 2);
    }

    #[tokio::test]
    async fn test_conflicting_write_aborts_selection() {
        let mut store = MockPoolStore::new();
        store.expect_read().returning(|| {
            Ok(PoolSnapshot {
                words: vec!["gato".to_string()],
                version: PoolVersion("1".to_string()),
            })
        });
        store.expect_write().returning(|_, expected| {
            Err(LingoError::PoolConflict {
                expected: expected.to_string(),
                found: "2".to_string(),
            })
        });
        store.expect_describe().return_const("mock".to_string());

        let mut selector = WordSelector::new(Box::new(store), Box::new(rejecting("-")), "es");
        let result = selector.select_word().await;

        assert!(matches!(result, Err(LingoError::PoolConflict { .. })));
    }

    #[tokio::test]
    async fn test_empty_pool_is_exhausted() {
        let mut oracle = MockWordOracle::new();
        oracle.expect_is_real().never();

        let mut selector = WordSelector::new(Box::new(pool(&[])), Box::new(oracle), "es");
        assert!(matches!(selector.select_word().await, Err(LingoError::PoolExhausted)));
    }
}
