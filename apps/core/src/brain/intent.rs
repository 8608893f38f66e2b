//! Intent classification by keyword containment.
//!
//! The table is scanned in declaration order and the first intent with any
//! matching keyword wins, so the order of `INTENT_TABLE` decides ambiguous
//! messages. Keywords cover English and romanised Urdu.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Detected intent type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Procedural question ("how to", "kaise")
    HowTo,
    /// Definition question ("what is", "kya hai")
    WhatIs,
    /// Document creation ("create", "banao")
    Create,
    /// Troubleshooting ("error", "masla")
    Error,
    /// Lookup ("find", "kahan")
    Find,
    /// Reporting ("report", "dikhao")
    Report,
    /// Configuration ("setup", "settings")
    Setup,
    /// Nothing matched
    General,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Intent {
    /// Returns the stored tag for the intent
    pub fn label(&self) -> &'static str {
        match self {
            Intent::HowTo => "how_to",
            Intent::WhatIs => "what_is",
            Intent::Create => "create",
            Intent::Error => "error",
            Intent::Find => "find",
            Intent::Report => "report",
            Intent::Setup => "setup",
            Intent::General => "general",
        }
    }
}

const INTENT_TABLE: &[(Intent, &[&str])] = &[
    (Intent::HowTo, &["how to", "how do i", "how can i", "kaise", "kaisay"]),
    (Intent::WhatIs, &["what is", "what are", "define", "kya hai", "kia hai"]),
    (Intent::Create, &["create", "new", "add", "banao", "banana"]),
    (
        Intent::Error,
        &["error", "issue", "problem", "not working", "masla", "kharabi"],
    ),
    (Intent::Find, &["find", "search", "where", "kahan", "dhundo"]),
    (Intent::Report, &["report", "list", "show me", "dikhao"]),
    (
        Intent::Setup,
        &["setup", "configure", "settings", "setting", "configuration"],
    ),
];

/// Intent classifier over a fixed, ordered keyword table
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify the intent of a text
    pub fn classify(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();

        INTENT_TABLE
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::General)
    }
}
