//! Ollama `/api/generate` backend on the local network.
//!
//! Request: `{model, prompt, stream:false, options:{temperature, num_predict}}`.
//! Response: `{response}`. No credential; long timeout for CPU inference.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::{check_status, read_json, text_at, Generator, ProviderError, ProviderKind, PLAIN_TEXT_INSTRUCTION, SELF_HOSTED_TIMEOUT};
use crate::brain::normalizer::normalize;

pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";

pub struct OllamaClient {
    http: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(http: reqwest::Client, url: String, model: Option<String>, temperature: f32) -> Self {
        Self {
            http,
            url,
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            temperature,
        }
    }

    pub(crate) fn full_prompt(prompt: &str, context: Option<&str>) -> String {
        let mut full = format!("{}\n\n", PLAIN_TEXT_INSTRUCTION);
        if let Some(context) = context {
            full.push_str(&format!("Context: {}\n\n", context));
        }
        full.push_str(&format!("Question: {}\n\nAnswer:", prompt));
        full
    }

    pub(crate) fn payload(&self, prompt: &str, context: Option<&str>, max_tokens: u32) -> serde_json::Value {
        json!({
            "model": self.model,
            "prompt": Self::full_prompt(prompt, context),
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": max_tokens,
            }
        })
    }
}

#[async_trait]
impl Generator for OllamaClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        debug!(provider = "ollama", model = %self.model, "sending generate request");

        let response = self
            .http
            .post(&self.url)
            .timeout(SELF_HOSTED_TIMEOUT)
            .json(&self.payload(prompt, context, max_tokens))
            .send()
            .await?;
        let response = check_status(response).await.inspect_err(|e| {
            warn!(provider = "ollama", error = %e, "generate request rejected");
        })?;
        let json = read_json(response).await?;
        let text = text_at(&json, "/response")?;

        Ok(normalize(text.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let client = OllamaClient::new(reqwest::Client::new(), "http://unused".into(), None, 0.7);
        let payload = client.payload("Where is the stock ledger?", None, 120);
        assert_eq!(payload["model"], DEFAULT_OLLAMA_MODEL);
        assert_eq!(payload["stream"], false);
        assert_eq!(payload["options"]["num_predict"], 120);
        let prompt = payload["prompt"].as_str().unwrap();
        assert!(prompt.ends_with("Question: Where is the stock ledger?\n\nAnswer:"));
        assert!(!prompt.contains("Context:"));
    }

    #[test]
    fn test_blank_model_falls_back_to_default() {
        let client = OllamaClient::new(reqwest::Client::new(), "http://unused".into(), Some("  ".into()), 0.7);
        assert_eq!(client.model, DEFAULT_OLLAMA_MODEL);
    }
}
