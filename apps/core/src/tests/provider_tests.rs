//! Provider wire formats against a mock server.

use crate::actors::llm::LocalModelHandle;
use crate::config::ProviderEndpoints;
use crate::providers::{
    ChatCompletionsClient, GeminiClient, Generator, OllamaClient, ProviderError, ProviderGateway, ProviderKind,
};
use crate::settings::ChatSettings;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTEXT: &str = "- Sales Invoice: Go to Selling > Sales Invoice > New";

fn chat_reply(content: &str) -> serde_json::Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

#[tokio::test]
async fn test_openrouter_sends_bearer_and_referer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer or-key"))
        .and(header("HTTP-Referer", "https://github.com/erpchat/erpchat"))
        .and(body_partial_json(json!({
            "model": "google/gemini-flash-1.5-8b:free",
            "max_tokens": 300,
            "messages": [
                { "role": "system" },
                { "role": "user", "content": "How do I create an invoice?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
            "### Steps\n\nGo to **Selling** and click `New`.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatCompletionsClient::openrouter(
        reqwest::Client::new(),
        format!("{}/api/v1/chat/completions", server.uri()),
        Some("or-key".into()),
        0.7,
    );
    let answer = client
        .generate("How do I create an invoice?", Some(CONTEXT), 300)
        .await
        .unwrap();

    assert_eq!(answer, "Steps\n\nGo to Selling and click New.");
}

#[tokio::test]
async fn test_deepseek_folds_context_into_system_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer ds-key"))
        .and(body_partial_json(json!({ "model": "deepseek-chat" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Open the Sales Invoice list.")))
        .mount(&server)
        .await;

    let client = ChatCompletionsClient::deepseek(
        reqwest::Client::new(),
        format!("{}/v1/chat/completions", server.uri()),
        Some("ds-key".into()),
        0.5,
    );
    let answer = client.generate("invoice?", Some(CONTEXT), 100).await.unwrap();
    assert_eq!(answer, "Open the Sales Invoice list.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let system = body["messages"][0]["content"].as_str().unwrap();
    assert!(system.contains(CONTEXT));
}

#[tokio::test]
async fn test_gemini_sends_key_as_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "gm-key"))
        .and(body_partial_json(json!({ "generationConfig": { "maxOutputTokens": 250 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "- Create the **invoice** first." }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(
        reqwest::Client::new(),
        format!("{}/v1beta/models/gemini-1.5-flash:generateContent", server.uri()),
        Some("gm-key".into()),
        0.7,
    );
    let answer = client.generate("invoice?", Some(CONTEXT), 250).await.unwrap();

    assert_eq!(answer, "Create the invoice first.");
}

#[tokio::test]
async fn test_gemini_candidate_without_text_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "role": "model" }, "finishReason": "MAX_TOKENS" }]
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(reqwest::Client::new(), server.uri(), Some("gm-key".into()), 0.7);
    let err = client.generate("invoice?", None, 50).await.unwrap_err();

    assert!(matches!(err, ProviderError::Malformed(_)));
}

#[tokio::test]
async fn test_ollama_sends_model_and_reads_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "qwen2.5:1.5b",
            "stream": false,
            "options": { "num_predict": 200 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "qwen2.5:1.5b",
            "response": "  Use the Leave Application form.  ",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(
        reqwest::Client::new(),
        format!("{}/api/generate", server.uri()),
        Some("qwen2.5:1.5b".into()),
        0.7,
    );
    let answer = client.generate("leave?", None, 200).await.unwrap();

    assert_eq!(answer, "Use the Leave Application form.");
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = OllamaClient::new(reqwest::Client::new(), server.uri(), None, 0.7);
    let err = client.generate("hi", None, 50).await.unwrap_err();

    assert_eq!(
        err,
        ProviderError::Http {
            status: 429,
            body: "rate limited".into()
        }
    );
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let client = ChatCompletionsClient::deepseek(reqwest::Client::new(), server.uri(), Some("k".into()), 0.7);
    let err = client.generate("hi", None, 50).await.unwrap_err();

    assert!(matches!(err, ProviderError::Malformed(_)));
}

#[tokio::test]
async fn test_missing_credential_never_hits_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gemini = GeminiClient::new(reqwest::Client::new(), server.uri(), Some(String::new()), 0.7);
    let err = gemini.generate("hi", None, 50).await.unwrap_err();

    assert!(matches!(err, ProviderError::NotConfigured(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Port 9 (discard) is closed on test machines.
    let client = OllamaClient::new(reqwest::Client::new(), "http://127.0.0.1:9/api/generate".into(), None, 0.7);
    let err = client.generate("hi", None, 50).await.unwrap_err();

    assert!(matches!(err, ProviderError::Transport(_)));
}

#[tokio::test]
async fn test_gateway_dispatches_on_selected_provider() {
    let endpoints = ProviderEndpoints::default();
    let local = LocalModelHandle::attach("http://127.0.0.1:9".into(), None);

    for kind in [
        ProviderKind::Local,
        ProviderKind::OpenRouter,
        ProviderKind::Gemini,
        ProviderKind::DeepSeek,
        ProviderKind::Ollama,
    ] {
        let settings = ChatSettings {
            enable_ai: true,
            provider: kind,
            ..Default::default()
        };
        let gateway = ProviderGateway::from_settings(&settings, &endpoints, local.clone());
        assert_eq!(gateway.kind(), kind);
    }
}

#[tokio::test]
async fn test_gateway_forwards_to_selected_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "From Ollama." })))
        .expect(1)
        .mount(&server)
        .await;

    let endpoints = ProviderEndpoints {
        ollama: format!("{}/api/generate", server.uri()),
        ..Default::default()
    };
    let settings = ChatSettings {
        enable_ai: true,
        provider: ProviderKind::Ollama,
        ..Default::default()
    };
    let gateway = ProviderGateway::from_settings(
        &settings,
        &endpoints,
        LocalModelHandle::attach("http://127.0.0.1:9".into(), None),
    );

    assert_eq!(gateway.generate("hi", None, 50).await.unwrap(), "From Ollama.");
}
