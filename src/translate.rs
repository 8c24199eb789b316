use async_trait::async_trait;
use tracing::info;

use crate::config::LlmConfig;
use crate::error::{Result, LingoError};
use crate::llm::{extract_text, OllamaClient};

/// Translates a sentence between two languages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String>;
}

/// Translator backed by an Ollama model, prompted for `{"text": ...}` JSON
pub struct LlmTranslator {
    client: OllamaClient,
}

impl LlmTranslator {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(OllamaClient::new(config)?))
    }
}

/// Build the translation prompt, asking for a JSON reply
pub fn build_translation_prompt(text: &str, source_language: &str, target_language: &str) -> String {
    let source_name = language_name(source_language);
    let target_name = language_name(target_language);

    format!(
        "Translate the following sentence from {} to {}: \"{}\"\n\
         \n\
         Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
         Do not include any explanations, alternatives, or text in other languages.\n",
        source_name, target_name, text, target_name
    )
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> Result<String> {
        let prompt = build_translation_prompt(text, source_language, target_language);
        let raw = self
            .client
            .generate(&prompt, true)
            .await
            .map_err(|e| LingoError::Translation(e.to_string()))?;

        let translation = extract_text(&raw);
        if translation.is_empty() {
            return Err(LingoError::Translation("Empty translation received".to_string()));
        }

        info!("Translated to {}: {}", target_language, translation);
        Ok(translation)
    }
}

/// Full English name for a language code, falling back to the code itself
pub fn language_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "ru" => "Russian",
        "sv" => "Swedish",
        "no" => "Norwegian",
        "da" => "Danish",
        "fi" => "Finnish",
        "pl" => "Polish",
        "el" => "Greek",
        "hu" => "Hungarian",
        "bg" => "Bulgarian",
        "ro" => "Romanian",
        "cs" => "Czech",
        "sk" => "Slovak",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "tr" => "Turkish",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "ca" => "Catalan",
        "gl" => "Galician",
        "eu" => "Basque",
        "uk" => "Ukrainian",
        _ => return code.to_string(),
    }
    .to_string()
}
