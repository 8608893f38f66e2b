//! OpenAI-style chat completion backends (OpenRouter and DeepSeek).
//!
//! Request: `{model, messages:[system, user], max_tokens, temperature}` with a
//! bearer token. Response: `choices[0].message.content`.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::{check_status, read_json, text_at, Generator, ProviderError, ProviderKind, HOSTED_TIMEOUT, PLAIN_TEXT_INSTRUCTION};
use crate::brain::normalizer::normalize;

pub const OPENROUTER_MODEL: &str = "google/gemini-flash-1.5-8b:free";
pub const DEEPSEEK_MODEL: &str = "deepseek-chat";
const OPENROUTER_REFERER: &str = "https://github.com/erpchat/erpchat";

pub struct ChatCompletionsClient {
    kind: ProviderKind,
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: &'static str,
    temperature: f32,
    /// Lead-in for the context sentence of the system message.
    context_lead: &'static str,
    extra_headers: Vec<(&'static str, &'static str)>,
}

impl ChatCompletionsClient {
    pub fn openrouter(http: reqwest::Client, url: String, api_key: Option<String>, temperature: f32) -> Self {
        Self {
            kind: ProviderKind::OpenRouter,
            http,
            url,
            api_key,
            model: OPENROUTER_MODEL,
            temperature,
            context_lead: "Use this context to answer",
            extra_headers: vec![("HTTP-Referer", OPENROUTER_REFERER)],
        }
    }

    pub fn deepseek(http: reqwest::Client, url: String, api_key: Option<String>, temperature: f32) -> Self {
        Self {
            kind: ProviderKind::DeepSeek,
            http,
            url,
            api_key,
            model: DEEPSEEK_MODEL,
            temperature,
            context_lead: "Use this context",
            extra_headers: Vec::new(),
        }
    }

    fn system_message(&self, context: Option<&str>) -> String {
        match context {
            Some(context) => format!(
                "You are a helpful ERP assistant. {}: {}. Always respond in plain text without markdown formatting (no **, ###, ---, or bullet points).",
                self.context_lead, context
            ),
            None => PLAIN_TEXT_INSTRUCTION.to_string(),
        }
    }

    pub(crate) fn payload(&self, prompt: &str, context: Option<&str>, max_tokens: u32) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system_message(context)},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": max_tokens,
            "temperature": self.temperature,
        })
    }
}

#[async_trait]
impl Generator for ChatCompletionsClient {
    fn kind(&self) -> ProviderKind {
        self.kind
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
            .ok_or_else(|| ProviderError::NotConfigured(format!("{} API key is not set", self.kind)))?;

        debug!(provider = %self.kind, model = self.model, "sending chat completion request");

        let mut request = self
            .http
            .post(&self.url)
            .timeout(HOSTED_TIMEOUT)
            .bearer_auth(api_key)
            .json(&self.payload(prompt, context, max_tokens));
        for (name, value) in &self.extra_headers {
            request = request.header(*name, *value);
        }

        let response = check_status(request.send().await?).await.inspect_err(|e| {
            warn!(provider = %self.kind, error = %e, "chat completion request rejected");
        })?;
        let json = read_json(response).await?;
        let content = text_at(&json, "/choices/0/message/content")?;

        Ok(normalize(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ChatCompletionsClient {
        ChatCompletionsClient::deepseek(reqwest::Client::new(), "http://unused".into(), Some("k".into()), 0.7)
    }

    #[test]
    fn test_payload_shape() {
        let payload = client().payload("How do I add a user?", Some("- Users: go to Setup"), 500);
        assert_eq!(payload["model"], "deepseek-chat");
        assert_eq!(payload["max_tokens"], 500);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "How do I add a user?");
        let system = payload["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("Use this context: - Users: go to Setup"));
        assert!(system.contains("plain text"));
    }

    #[test]
    fn test_system_message_without_context() {
        let payload = client().payload("hi", None, 50);
        assert_eq!(payload["messages"][0]["content"], PLAIN_TEXT_INSTRUCTION);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = ChatCompletionsClient::openrouter(reqwest::Client::new(), "http://unused".into(), None, 0.7);
        let err = client.generate("hi", None, 50).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
