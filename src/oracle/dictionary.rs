use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::WordOracle;
use crate::config::{resolve_secret, OracleConfig};
use crate::error::{Result, LingoError};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    n_results: u64,
}

/// Oracle backed by a hosted dictionary search API (RapidAPI-style headers)
pub struct DictionaryOracle {
    client: reqwest::Client,
    url: String,
    host: String,
    api_key: String,
}

impl DictionaryOracle {
    pub fn new(url: String, host: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            host,
            api_key,
        })
    }

    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let api_key = resolve_secret(&config.api_key_env)?;
        Self::new(
            config.api_url.clone(),
            config.api_host.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

/// Turn a search response into a verdict. Zero results means the word is not real.
fn interpret_response(status: StatusCode, body: &str) -> Result<bool> {
    if !status.is_success() {
        return Err(LingoError::OracleUnavailable(format!(
            "dictionary returned {}",
            status
        )));
    }

    let response: SearchResponse = serde_json::from_str(body).map_err(|e| {
        LingoError::OracleUnavailable(format!("unexpected dictionary response: {}", e))
    })?;

    Ok(response.n_results > 0)
}

#[async_trait]
impl WordOracle for DictionaryOracle {
    async fn is_real(&self, word: &str, language: &str) -> Result<bool> {
        let response = self
            .client
            .get(&self.url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .query(&[("text", word), ("language", language)])
            .send()
            .await
            .map_err(|e| LingoError::OracleUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LingoError::OracleUnavailable(e.to_string()))?;

        let verdict = interpret_response(status, &body)?;
        debug!("Dictionary verdict for '{}' ({}): {}", word, language, verdict);
        Ok(verdict)
    }
}
