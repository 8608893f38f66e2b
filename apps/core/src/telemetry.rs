use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::error::AppError;

/// Installs the global subscriber.
///
/// `RUST_LOG` picks the filter (default `info`). With `ERPCHAT_LOG_FORMAT=json`
/// events are written as Bunyan JSON, otherwise as human-readable lines. Logs
/// go to stderr; stdout carries command output only.
pub fn init(app_name: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("ERPCHAT_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = Registry::default().with(filter);
    let result = if json {
        registry
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new(app_name.to_string(), std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
    };

    result.map_err(|e| AppError::Config(format!("Failed to install logger: {}", e)))
}
