//! Owner tasks.
//!
//! - `llm`: owns the local `llama-server` sidecar and serializes load-then-serve.
//! - `supervisor`: the outer request handler behind a message channel.

pub mod llm;
pub mod messages;
pub mod supervisor;
pub mod traits;
