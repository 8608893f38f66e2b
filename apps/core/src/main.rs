// ERPChat Backend Entry Point
// Reads commands from stdin, answers on stdout as JSON lines.

use anyhow::Context;
use erpchat_core::actors::llm::LocalModelHandle;
use erpchat_core::actors::supervisor::{
    ChatService, FeedbackRequest, GatewayFactory, QueryRequest, SupervisorHandle, DEFAULT_HISTORY_LIMIT,
    DEFAULT_SEARCH_LIMIT,
};
use erpchat_core::brain::matcher::SearchFilters;
use erpchat_core::config::AppConfig;
use erpchat_core::database::{self, Database};
use erpchat_core::models::Rating;
use erpchat_core::{seed, telemetry};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Debug, PartialEq)]
enum Command {
    Ask(String),
    Feedback { message_id: i64, rating: Rating },
    History,
    Suggest(Option<String>),
    Context(Option<String>),
    Search(String),
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Ask(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let optional = |s: &str| (!s.is_empty()).then(|| s.to_string());

    match name {
        "feedback" => {
            let (id, rating) = args
                .split_once(char::is_whitespace)
                .ok_or("usage: /feedback <message_id> <rating>")?;
            let message_id = id.parse().map_err(|_| format!("not a message id: {}", id))?;
            let rating = rating.parse()?;
            Ok(Command::Feedback { message_id, rating })
        }
        "history" => Ok(Command::History),
        "suggest" => Ok(Command::Suggest(optional(args))),
        "context" => Ok(Command::Context(optional(args))),
        "search" if !args.is_empty() => Ok(Command::Search(args.to_string())),
        "search" => Err("usage: /search <query>".to_string()),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: /{}", other)),
    }
}

fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Failed to serialize output: {}", e),
    }
}

fn emit_error(message: impl std::fmt::Display) {
    emit(&serde_json::json!({ "success": false, "error": message.to_string() }));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var_os("ERPCHAT_ENV_FILE") {
        Some(path) => AppConfig::load_from(std::path::Path::new(&path)),
        None => AppConfig::load(),
    }
    .context("reading configuration")?;
    telemetry::init("erpchat")?;
    if let Some(path) = &config.env_file {
        info!("Loaded environment from {:?}", path);
    }
    config.ensure_dirs().context("creating data directories")?;

    let pool = database::init_db(&config.database_url)
        .await
        .context("opening database")?;
    seed::load_knowledge_base(&pool).await?;
    seed::load_proactive_rules(&pool).await?;

    let local = LocalModelHandle::new(config.local_model.clone());
    let generators = Arc::new(GatewayFactory::new(config.endpoints.clone(), local));
    let user_id = std::env::var("USER").unwrap_or_else(|_| "Administrator".to_string());
    let supervisor = SupervisorHandle::new(ChatService::new(Database::new(pool), generators, user_id));

    info!("ERPChat ready, reading commands from stdin");

    let mut session_id: Option<String> = None;
    let mut context_entity_type: Option<String> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                emit_error(e);
                continue;
            }
        };

        match command {
            Command::Ask(message) => {
                let request = QueryRequest {
                    message,
                    session_id: session_id.clone(),
                    context_entity_type: context_entity_type.clone(),
                    ..Default::default()
                };
                match supervisor.query(request).await {
                    Ok(response) => {
                        if response.success {
                            session_id = response.session_id.clone();
                        }
                        emit(&response);
                    }
                    Err(e) => emit_error(e),
                }
            }
            Command::Feedback { message_id, rating } => {
                let request = FeedbackRequest {
                    message_id,
                    rating,
                    feedback_text: None,
                    correction: None,
                };
                match supervisor.submit_feedback(request).await {
                    Ok(()) => emit(&serde_json::json!({ "success": true })),
                    Err(e) => emit_error(e),
                }
            }
            Command::History => match &session_id {
                Some(id) => match supervisor.session_history(id.clone(), DEFAULT_HISTORY_LIMIT).await {
                    Ok(messages) => emit(&messages),
                    Err(e) => emit_error(e),
                },
                None => emit_error("no active session"),
            },
            Command::Suggest(entity_type) => {
                match supervisor
                    .proactive_suggestions(entity_type.or_else(|| context_entity_type.clone()))
                    .await
                {
                    Ok(suggestions) => emit(&suggestions),
                    Err(e) => emit_error(e),
                }
            }
            Command::Context(entity_type) => {
                // A new context starts a new session.
                context_entity_type = entity_type;
                session_id = None;
                emit(&serde_json::json!({ "success": true, "context": context_entity_type }));
            }
            Command::Search(query) => {
                match supervisor
                    .search_knowledge_base(query, SearchFilters::default(), DEFAULT_SEARCH_LIMIT)
                    .await
                {
                    Ok(results) => emit(&results),
                    Err(e) => emit_error(e),
                }
            }
            Command::Quit => break,
        }
    }

    supervisor.shutdown().await;
    Ok(())
}
