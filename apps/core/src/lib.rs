//! ERPChat core: turns a user's chat message into a sourced, scored answer.
//!
//! The decision pipeline lives in [`brain`]; answer backends in [`providers`];
//! the request handler, local model owner and their messages in [`actors`].

pub mod actors;
pub mod brain;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod providers;
pub mod recorder;
pub mod seed;
pub mod settings;
pub mod telemetry;

#[cfg(test)]
mod tests;
