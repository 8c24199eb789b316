use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::{Result, LingoError};

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TextResult {
    text: String,
}

/// Minimal Ollama `/api/generate` client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one non-streaming completion. With `json_mode` the model is
    /// constrained to emit a JSON document.
    pub async fn generate(&self, prompt: &str, json_mode: bool) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: json_mode.then(|| "json".to_string()),
        };

        let url = format!("{}/api/generate", self.endpoint);
        debug!("Sending generate request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LingoError::Llm(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LingoError::Llm(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LingoError::Llm(format!("Failed to parse response: {}", e)))?;

        let raw = body.response.trim().to_string();
        debug!("Raw Ollama response: {}", raw);

        if raw.is_empty() {
            return Err(LingoError::Llm("Empty response received".to_string()));
        }
        Ok(raw)
    }

    /// Check that Ollama is reachable and the model is pulled
    pub async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": self.model }))
            .send()
            .await
            .map_err(|e| LingoError::Llm(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.model);
            Ok(())
        } else {
            Err(LingoError::Llm(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.model, self.model
            )))
        }
    }
}

/// Pull the answer out of a model reply: a `{"text": ...}` document if the
/// model produced one, otherwise the first line that is not chatter.
pub fn extract_text(raw: &str) -> String {
    let unfenced = remove_markdown_code_blocks(raw);

    if let Ok(result) = serde_json::from_str::<TextResult>(&unfenced) {
        return strip_quotes(result.text.trim()).to_string();
    }

    strip_quotes(&clean_response(&unfenced)).to_string()
}

/// Remove markdown code fences around a reply
pub fn remove_markdown_code_blocks(text: &str) -> String {
    let text = text.trim();

    for (open, close) in [("```json", "```"), ("```", "```"), ("`json", "`"), ("`", "`")] {
        if text.len() >= open.len() + close.len() && text.starts_with(open) && text.ends_with(close) {
            return text[open.len()..text.len() - close.len()].trim().to_string();
        }
    }

    text.to_string()
}

/// First substantive line of a free-form reply
pub fn clean_response(response: &str) -> String {
    let lines: Vec<&str> = response.lines().collect();

    for &line in &lines {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with("Here are")
            || trimmed.starts_with("Here is")
            || trimmed.starts_with("Option")
            || trimmed.starts_with("**Option")
            || trimmed.starts_with("- ")
            || trimmed.starts_with("* ")
            || trimmed.ends_with(':')
        {
            continue;
        }

        if trimmed.starts_with("**") && trimmed.ends_with("**") {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("Translation:") {
            if !rest.trim().is_empty() {
                return rest.trim().to_string();
            }
            continue;
        }

        if trimmed.chars().count() > 3 {
            return trimmed.to_string();
        }
    }

    for &line in &lines {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    response.trim().to_string()
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('“', '”'), ('«', '»'), ('\'', '\'')] {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            return inner.trim();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_text() {
        assert_eq!(extract_text(r#"{"text": "The dog runs."}"#), "The dog runs.");
        assert_eq!(
            extract_text("```json\n{\"text\": \"The dog runs.\"}\n```"),
            "The dog runs."
        );
    }

    #[test]
    fn test_extract_falls_back_to_first_real_line() {
        let raw = "Here is an example sentence:\n\n\"El perro corre en el parque.\"\n\nThis shows...";
        assert_eq!(extract_text(raw), "El perro corre en el parque.");
    }

    #[test]
    fn test_translation_prefix_is_stripped() {
        assert_eq!(extract_text("Translation: The dog runs."), "The dog runs.");
    }

    #[test]
    fn test_remove_markdown_code_blocks() {
        assert_eq!(remove_markdown_code_blocks("```\nhola\n```"), "hola");
        assert_eq!(remove_markdown_code_blocks("`hola`"), "hola");
        assert_eq!(remove_markdown_code_blocks("hola"), "hola");
        assert_eq!(remove_markdown_code_blocks("`"), "`");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("«Hola»"), "Hola");
        assert_eq!(strip_quotes("\"Hola\""), "Hola");
        assert_eq!(strip_quotes("Hola"), "Hola");
    }
}
