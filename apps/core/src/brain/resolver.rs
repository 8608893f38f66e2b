//! Response Resolver - the ordered decision chain behind every answer.
//!
//! Stages, first qualifying answer wins:
//! 1. Confident knowledge-base match (score >= 2).
//! 2. Provider enrichment, when AI is enabled and the knowledge base had any candidates.
//! 3. Context-aware template for the screen the chat was opened from.
//! 4. Intent template.
//! 5. Default greeting.
//!
//! The resolver never writes anything. The caller applies the usage increment
//! for a knowledge-base answer and records the exchange.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::intent::{Intent, IntentClassifier};
use super::matcher::{self, SearchFilters};
use super::templates;
use crate::actors::traits::KnowledgeStore;
use crate::models::{AnswerResult, AnswerSource, Language, ScoredArticle};
use crate::providers::Generator;

/// Number of knowledge-base candidates considered per query.
pub const CANDIDATE_LIMIT: usize = 3;
/// Highest confidence a knowledge-base answer can carry.
pub const KB_CONFIDENCE_CAP: u8 = 95;
/// Points of confidence per matched query term.
pub const KB_POINTS_PER_TERM: u32 = 30;
pub const HOSTED_CONFIDENCE: u8 = 85;
pub const LOCAL_CONFIDENCE: u8 = 75;
/// Provider replies must be longer than this many characters.
pub const MIN_GENERATED_CHARS: usize = 20;
/// Characters of each candidate answer folded into the provider context.
pub const CONTEXT_SNIPPET_CHARS: usize = 300;

const URDU_DIRECTIVE: &str = "\n\nPlease respond in Urdu (اردو میں جواب دیں).";

/// What the resolver decided, plus what the caller needs to record it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub answer: AnswerResult,
    pub intent: Intent,
    /// Article behind a knowledge-base answer. Its usage counter is due an increment.
    pub article_id: Option<String>,
}

/// Turns a message into an [`AnswerResult`].
pub struct Resolver {
    store: Arc<dyn KnowledgeStore>,
    /// `None` when AI is disabled; stage 2 is then skipped entirely.
    generator: Option<Arc<dyn Generator>>,
    max_tokens: u32,
    classifier: IntentClassifier,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        generator: Option<Arc<dyn Generator>>,
        max_tokens: u32,
    ) -> Self {
        Self {
            store,
            generator,
            max_tokens,
            classifier: IntentClassifier::new(),
        }
    }

    pub async fn resolve(
        &self,
        message: &str,
        context_entity_type: Option<&str>,
        language: Language,
    ) -> Resolution {
        let intent = self.classifier.classify(message);
        let candidates = self.candidates(message, language).await;

        // 1. Confident knowledge-base match
        if matcher::is_confident(&candidates) {
            let top = &candidates[0];
            info!(
                article = %top.article.id,
                score = top.relevance_score,
                "answered from knowledge base"
            );
            return Resolution {
                answer: kb_answer(&candidates, language),
                intent,
                article_id: Some(top.article.id.clone()),
            };
        }

        // 2. Provider enrichment
        if let Some(generator) = &self.generator {
            if !candidates.is_empty() {
                if let Some(answer) = self.enrich(generator.as_ref(), message, &candidates, language).await {
                    return Resolution {
                        answer,
                        intent,
                        article_id: None,
                    };
                }
            }
        }

        // 3-5. Fixed replies
        let answer = context_entity_type
            .and_then(|entity_type| templates::context_reply(entity_type, language))
            .or_else(|| templates::intent_reply(intent, language))
            .unwrap_or_else(|| templates::default_reply(language));
        debug!(source = ?answer.source, %intent, "answered from templates");

        Resolution {
            answer,
            intent,
            article_id: None,
        }
    }

    async fn candidates(&self, message: &str, language: Language) -> Vec<ScoredArticle> {
        let filters = SearchFilters::for_language(language);
        match self.store.candidate_articles(&filters).await {
            Ok(articles) => matcher::search(message, &articles, &filters, CANDIDATE_LIMIT),
            Err(e) => {
                warn!(error = %e, "knowledge base unavailable, continuing without candidates");
                Vec::new()
            }
        }
    }

    async fn enrich(
        &self,
        generator: &dyn Generator,
        message: &str,
        candidates: &[ScoredArticle],
        language: Language,
    ) -> Option<AnswerResult> {
        let context = build_context(candidates);
        let prompt = match language {
            Language::Urdu => format!("{}{}", message, URDU_DIRECTIVE),
            Language::English => message.to_string(),
        };

        let kind = generator.kind();
        match generator.generate(&prompt, Some(&context), self.max_tokens).await {
            Ok(text) if text.chars().count() > MIN_GENERATED_CHARS => {
                info!(provider = %kind, "answered from provider");
                Some(AnswerResult {
                    answer: text,
                    source: AnswerSource::Llm,
                    confidence: if kind.is_local_model() {
                        LOCAL_CONFIDENCE
                    } else {
                        HOSTED_CONFIDENCE
                    },
                    suggestions: candidates.iter().map(|c| c.article.title.clone()).collect(),
                })
            }
            Ok(text) => {
                warn!(provider = %kind, chars = text.chars().count(), "provider reply too short, falling through");
                None
            }
            Err(e) => {
                warn!(provider = %kind, error = %e, "provider unavailable, falling through");
                None
            }
        }
    }
}

/// Knowledge-base confidence for a top score: 30 points per term, capped at 95.
pub fn kb_confidence(score: u32) -> u8 {
    score
        .saturating_mul(KB_POINTS_PER_TERM)
        .min(u32::from(KB_CONFIDENCE_CAP)) as u8
}

fn kb_answer(candidates: &[ScoredArticle], language: Language) -> AnswerResult {
    let top = &candidates[0];
    AnswerResult {
        answer: top.article.answer_for(language).to_string(),
        source: AnswerSource::KnowledgeBase,
        confidence: kb_confidence(top.relevance_score),
        suggestions: candidates[1..]
            .iter()
            .map(|c| c.article.title.clone())
            .collect(),
    }
}

/// `- title: answer` lines for the top candidates, answers cut to 300 characters.
pub fn build_context(candidates: &[ScoredArticle]) -> String {
    candidates
        .iter()
        .take(CANDIDATE_LIMIT)
        .map(|c| {
            let snippet: String = c.article.answer.chars().take(CONTEXT_SNIPPET_CHARS).collect();
            format!("- {}: {}", c.article.title, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
