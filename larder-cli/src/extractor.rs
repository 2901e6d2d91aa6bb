//! Ingredient-name extraction through a local Ollama model.
//!
//! Raw ingredient lines ("2 cups all-purpose flour, sifted") are sent to the
//! model, which answers with bare names separated by commas.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ExtractorSettings;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("extractor returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid extractor response: {0}")]
    Decode(reqwest::Error),
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for the `/api/generate` endpoint.
pub struct IngredientExtractor {
    client: Client,
    endpoint: String,
    model: String,
}

impl IngredientExtractor {
    pub fn new(settings: &ExtractorSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Extract core ingredient names from free text.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn extract(&self, text: &str) -> Vec<String> {
        match self.try_extract(text).await {
            Ok(names) => names,
            Err(e) => {
                warn!("Ingredient extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_extract(&self, text: &str) -> Result<Vec<String>, ExtractorError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(text),
            stream: false,
            options: GenerateOptions {
                temperature: 0.1,
                num_predict: 200,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| ExtractorError::Request {
                endpoint: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ExtractorError::Status(response.status()));
        }

        let body: GenerateResponse = response.json().await.map_err(ExtractorError::Decode)?;
        let names = parse_names(&body.response);
        debug!(count = names.len(), "Extracted ingredient names");
        Ok(names)
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        "Extract only core ingredient names from: {}\n\
         Return only ingredient names separated by commas, if you could not \
         get the ingredient names then return empty string, no other text:",
        text
    )
}

/// Split a comma-separated model answer into trimmed, non-empty names.
pub fn parse_names(answer: &str) -> Vec<String> {
    answer
        .trim()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(
            parse_names(" Flour, Sugar ,, Butter,\n"),
            vec!["Flour", "Sugar", "Butter"]
        );
        assert!(parse_names("").is_empty());
        assert!(parse_names(" , ").is_empty());
    }

    #[test]
    fn test_prompt_mentions_text() {
        let prompt = build_prompt("2 cups flour, 1 egg");
        assert!(prompt.contains("2 cups flour, 1 egg"));
        assert!(prompt.ends_with("no other text:"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_nothing() {
        let extractor = IngredientExtractor::new(&ExtractorSettings {
            enabled: true,
            // Port 9 (discard) is closed on test machines.
            endpoint: "http://127.0.0.1:9".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout_secs: 2,
        })
        .unwrap();
        assert!(extractor.extract("flour").await.is_empty());
    }
}
