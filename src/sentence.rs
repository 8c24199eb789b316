use async_trait::async_trait;
use tracing::info;

use crate::config::LlmConfig;
use crate::error::{Result, LingoError};
use crate::llm::{extract_text, OllamaClient};
use crate::words::VerifiedWord;

/// Produces an example sentence showing how a word is used
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentenceGenerator: Send + Sync {
    async fn generate(&self, word: &VerifiedWord) -> Result<String>;
}

/// Sentence generator backed by an Ollama model
pub struct LlmSentenceGenerator {
    client: OllamaClient,
    prompt_template: String,
}

impl LlmSentenceGenerator {
    pub fn new(client: OllamaClient, prompt_template: String) -> Self {
        Self {
            client,
            prompt_template,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(OllamaClient::new(config)?, config.sentence_prompt.clone()))
    }

    fn build_prompt(&self, word: &str) -> String {
        let prompt = if self.prompt_template.contains("{word}") {
            self.prompt_template.replace("{word}", word)
        } else {
            format!("{} {}", self.prompt_template.trim_end(), word)
        };

        format!(
            "{}\n\nReturn ONLY the sentence in JSON format as {{\"text\":\"sentence here\"}}.",
            prompt
        )
    }
}

#[async_trait]
impl SentenceGenerator for LlmSentenceGenerator {
    async fn generate(&self, word: &VerifiedWord) -> Result<String> {
        let raw = self.client.generate(&self.build_prompt(&word.text), true).await?;
        let sentence = extract_text(&raw);

        if sentence.split_whitespace().next().is_none() {
            return Err(LingoError::Llm(format!(
                "No example sentence returned for '{}'",
                word.text
            )));
        }

        info!("Example sentence for '{}': {}", word.text, sentence);
        Ok(sentence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(template: &str) -> LlmSentenceGenerator {
        let client = OllamaClient::new(&LlmConfig::default()).unwrap();
        LlmSentenceGenerator::new(client, template.to_string())
    }

    #[test]
    fn test_prompt_substitutes_word() {
        let prompt = generator("escribe una frase de ejemplo sobre el uso de la palabra {word}")
            .build_prompt("gato");
        assert!(prompt.starts_with("escribe una frase de ejemplo sobre el uso de la palabra gato\n"));
        assert!(prompt.contains("{\"text\""));
    }

    #[test]
    fn test_prompt_without_placeholder_appends_word() {
        let prompt = generator("Use this word in a sentence:").build_prompt("gato");
        assert!(prompt.starts_with("Use this word in a sentence: gato"));
    }
}
