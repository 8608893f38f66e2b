//! # Brain Module
//!
//! The pure decision pipeline. Nothing here writes to the record store.
//!
//! ## Components
//! - `normalizer`: strips markdown from provider output
//! - `language`: English/Urdu detection by script
//! - `intent`: ordered keyword intent classification
//! - `matcher`: knowledge-base term-overlap ranking
//! - `templates`: fixed context, intent and default replies
//! - `resolver`: the staged answer chain
//! - `proactive`: rule evaluation for unsolicited suggestions

pub mod intent;
pub mod language;
pub mod matcher;
pub mod normalizer;
pub mod proactive;
pub mod resolver;
pub mod templates;

pub use intent::{Intent, IntentClassifier};
pub use matcher::SearchFilters;
pub use resolver::{Resolution, Resolver};
