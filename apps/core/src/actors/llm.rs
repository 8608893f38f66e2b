use crate::actors::messages::LlmMessage;
use crate::brain::normalizer::normalize;
use crate::providers::{Generator, ProviderError, ProviderKind, PLAIN_TEXT_INSTRUCTION};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{error, info, warn};

/// How to launch the local model server.
#[derive(Debug, Clone)]
pub struct LocalModelConfig {
    /// The path to the GGUF model file for `llama-server`.
    pub model_path: PathBuf,
    /// `llama-server` executable; a bare name is looked up in `PATH`.
    pub server_binary: PathBuf,
    pub port: u16,
    /// Optional token the server will require on every request.
    pub auth_token: Option<String>,
}

/// A handle to the local model actor.
///
/// The actor owns the `llama-server` child process. The process is started on
/// the first request, never at construction, and requests are served one at a
/// time, so the model is loaded at most once per process lifetime.
#[derive(Clone)]
pub struct LocalModelHandle {
    sender: mpsc::Sender<LlmMessage>,
}

impl LocalModelHandle {
    /// Creates a new actor that will launch `llama-server` lazily.
    pub fn new(config: LocalModelConfig) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let actor = LocalModelRunner::new(receiver, config);
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }

    /// Creates an actor that talks to an already running server at `server_url`.
    pub fn attach(server_url: String, auth_token: Option<String>) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let actor = LocalModelRunner::attached(receiver, server_url, auth_token);
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }
}

#[async_trait]
impl Generator for LocalModelHandle {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let (send, recv) = oneshot::channel();
        let msg = LlmMessage::Generate {
            prompt: prompt.to_string(),
            context: context.map(str::to_string),
            max_tokens,
            responder: send,
        };

        self.sender
            .send(msg)
            .await
            .map_err(|_| ProviderError::Unavailable("local model actor stopped".into()))?;
        // Covers a cold start (health checks) followed by one completion.
        timeout(HANDLE_TIMEOUT, recv)
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|_| ProviderError::Unavailable("local model actor dropped the request".into()))?
    }
}

// --- Constants ---
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);
const HANDLE_TIMEOUT: Duration = Duration::from_secs(180);
const HEALTH_RETRIES: u32 = if cfg!(test) { 3 } else { 30 };
const HEALTH_INTERVAL: Duration = Duration::from_secs(1);
const SAMPLING_TEMPERATURE: f64 = 0.7;

enum ModelState {
    NotLoaded,
    Ready,
    /// Loading failed once; the reason is reported for every later request.
    Failed(String),
}

// --- Actor Runner (Internal Logic) ---
struct LocalModelRunner {
    receiver: mpsc::Receiver<LlmMessage>,
    child: Option<tokio::process::Child>,
    server_url: String,
    config: Option<LocalModelConfig>,
    client: Client,
    auth_token: Option<String>,
    state: ModelState,
}

impl Drop for LocalModelRunner {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            // start_kill() is non-blocking and works outside an async context
            match child.start_kill() {
                Ok(_) => info!("llama-server process termination initiated"),
                Err(e) => error!("Failed to kill llama-server process: {}", e),
            }
        }
    }
}

impl LocalModelRunner {
    fn new(receiver: mpsc::Receiver<LlmMessage>, config: LocalModelConfig) -> Self {
        Self {
            receiver,
            child: None,
            server_url: format!("http://127.0.0.1:{}", config.port),
            auth_token: config.auth_token.clone(),
            config: Some(config),
            client: Client::new(),
            state: ModelState::NotLoaded,
        }
    }

    fn attached(receiver: mpsc::Receiver<LlmMessage>, server_url: String, auth_token: Option<String>) -> Self {
        Self {
            receiver,
            child: None,
            server_url: server_url.trim_end_matches('/').to_string(),
            config: None,
            client: Client::new(),
            auth_token,
            state: ModelState::Ready,
        }
    }

    async fn run(mut self) {
        info!("Local model actor started");
        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg).await;
        }
        info!("Local model actor stopped");
    }

    async fn handle_message(&mut self, msg: LlmMessage) {
        match msg {
            LlmMessage::Generate {
                prompt,
                context,
                max_tokens,
                responder,
            } => {
                let result = match self.ensure_loaded().await {
                    Ok(()) => {
                        self.generate_completion(&prompt, context.as_deref(), max_tokens)
                            .await
                    }
                    Err(e) => Err(e),
                };
                if let Err(e) = &result {
                    warn!(error = %e, "local model generation failed");
                }
                let _ = responder.send(result);
            }
        }
    }

    async fn ensure_loaded(&mut self) -> Result<(), ProviderError> {
        match &self.state {
            ModelState::Ready => return Ok(()),
            ModelState::Failed(reason) => return Err(ProviderError::Unavailable(reason.clone())),
            ModelState::NotLoaded => {}
        }

        match self.start_server().await {
            Ok(()) => {
                self.state = ModelState::Ready;
                Ok(())
            }
            Err(reason) => {
                error!("Failed to load local model: {}", reason);
                self.state = ModelState::Failed(reason.clone());
                Err(ProviderError::Unavailable(reason))
            }
        }
    }

    async fn start_server(&mut self) -> Result<(), String> {
        let config = self
            .config
            .clone()
            .ok_or_else(|| "no launch configuration".to_string())?;

        if !config.model_path.exists() {
            return Err(format!("model file not found: {}", config.model_path.display()));
        }

        let binary = which::which(&config.server_binary).map_err(|_| {
            format!(
                "{} not found in PATH. Please ensure llama.cpp is installed.",
                config.server_binary.display()
            )
        })?;

        info!("Starting llama-server with model: {:?}", config.model_path);

        let mut command = Command::new(binary);
        command
            .arg("-m")
            .arg(&config.model_path)
            .arg("--host")
            .arg("127.0.0.1")
            .arg("--port")
            .arg(config.port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(token) = &config.auth_token {
            command.arg("--api-key").arg(token);
        }

        let child = command
            .spawn()
            .map_err(|e| format!("failed to spawn llama-server: {}", e))?;
        self.child = Some(child);

        let result = self.wait_until_healthy().await;
        if result.is_err() {
            self.stop_server().await;
        }
        result
    }

    async fn wait_until_healthy(&mut self) -> Result<(), String> {
        let health_endpoint = format!("{}/health", self.server_url);
        for attempt in 1..=HEALTH_RETRIES {
            tokio::time::sleep(HEALTH_INTERVAL).await;

            if let Some(child) = self.child.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(format!("llama-server exited during startup: {}", status));
                }
            }

            match self.client.get(&health_endpoint).send().await {
                Ok(response) if response.status().is_success() => {
                    info!("llama-server is ready after {} attempts", attempt);
                    return Ok(());
                }
                Ok(response) => {
                    info!("Server responded with status {} on attempt {}", response.status(), attempt);
                }
                Err(e) => {
                    info!("Health check attempt {} failed: {}", attempt, e);
                }
            }
        }

        Err(format!(
            "llama-server failed to become ready after {} seconds",
            HEALTH_RETRIES
        ))
    }

    /// Kills and reaps a server that never became healthy.
    async fn stop_server(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Ok(Some(status)) = child.try_wait() {
            info!("llama-server already exited: {}", status);
            return;
        }
        match child.kill().await {
            Ok(()) => info!("llama-server stopped after failed startup"),
            Err(e) => error!("Failed to kill llama-server process: {}", e),
        }
    }

    fn build_prompt(prompt: &str, context: Option<&str>) -> String {
        match context {
            Some(context) => format!(
                "{}\n\nContext: {}\n\nQuestion: {}\n\nAnswer:",
                PLAIN_TEXT_INSTRUCTION, context, prompt
            ),
            None => format!(
                "{} Answer the following question clearly and concisely.\n\nQuestion: {}\n\nAnswer:",
                PLAIN_TEXT_INSTRUCTION, prompt
            ),
        }
    }

    async fn generate_completion(
        &self,
        prompt: &str,
        context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let payload = serde_json::json!({
            "prompt": Self::build_prompt(prompt, context),
            "stream": false,
            "n_predict": max_tokens,
            "temperature": SAMPLING_TEMPERATURE,
        });

        let mut request = self
            .client
            .post(format!("{}/completion", self.server_url))
            .timeout(COMPLETION_TIMEOUT)
            .json(&payload);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let res = request.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let content = json["content"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed("missing field content".into()))?;

        // Small models ramble; keep the first paragraph only.
        let first_paragraph = content.trim().split("\n\n").next().unwrap_or("").trim();
        Ok(normalize(first_paragraph))
    }
}
