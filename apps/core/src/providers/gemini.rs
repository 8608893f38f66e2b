//! Google Gemini `generateContent` backend.
//!
//! The key travels as the `key` query parameter. Request:
//! `{contents:[{parts:[{text}]}], generationConfig:{temperature, maxOutputTokens}}`.
//! Response: `candidates[0].content.parts[0].text`; a candidate without text
//! (truncated, or only thinking tokens) counts as malformed.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use super::{check_status, read_json, text_at, Generator, ProviderError, ProviderKind, HOSTED_TIMEOUT, PLAIN_TEXT_INSTRUCTION};
use crate::brain::normalizer::normalize;

pub struct GeminiClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, url: String, api_key: Option<String>, temperature: f32) -> Self {
        Self {
            http,
            url,
            api_key,
            temperature,
        }
    }

    pub(crate) fn full_prompt(prompt: &str, context: Option<&str>) -> String {
        match context {
            Some(context) => format!(
                "Context: {}\n\nQuestion: {}\n\nProvide a helpful answer for ERP users in plain text without any markdown formatting (no **, ###, ---, or bullet points). Use simple paragraphs only.",
                context, prompt
            ),
            None => format!("{}\n\n{}", PLAIN_TEXT_INSTRUCTION, prompt),
        }
    }

    pub(crate) fn payload(&self, prompt: &str, context: Option<&str>, max_tokens: u32) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [{"text": Self::full_prompt(prompt, context)}]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": max_tokens,
            }
        })
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("Gemini API key is not set".into()))?;
        let url = Url::parse_with_params(&self.url, &[("key", api_key)])
            .map_err(|e| ProviderError::NotConfigured(format!("bad Gemini URL: {}", e)))?;

        debug!(provider = "gemini", "sending generateContent request");

        let response = self
            .http
            .post(url)
            .timeout(HOSTED_TIMEOUT)
            .json(&self.payload(prompt, context, max_tokens))
            .send()
            .await?;
        let response = check_status(response).await.inspect_err(|e| {
            warn!(provider = "gemini", error = %e, "generateContent request rejected");
        })?;
        let json = read_json(response).await?;
        let text = text_at(&json, "/candidates/0/content/parts/0/text")?;

        Ok(normalize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let client = GeminiClient::new(reqwest::Client::new(), "http://unused".into(), Some("k".into()), 0.5);
        let payload = client.payload("What is a BOM?", Some("- BOM: bill of materials"), 300);
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 300);
        let text = payload["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Context: - BOM: bill of materials\n\nQuestion: What is a BOM?"));
        assert!(text.contains("plain text"));
    }

    #[test]
    fn test_prompt_without_context_still_demands_plain_text() {
        let text = GeminiClient::full_prompt("hi", None);
        assert!(text.starts_with(PLAIN_TEXT_INSTRUCTION));
        assert!(text.ends_with("hi"));
    }
}
