//! Knowledge-base matching by term overlap.
//!
//! A query is lower-cased and split on whitespace. Each term that occurs as a
//! substring of an article's title, question and keywords adds one point.
//! Repeated query terms count once per occurrence.

use crate::models::{KnowledgeArticle, Language, ScoredArticle};

/// Score at which the top result is used as the answer without enrichment.
pub const CONFIDENT_MATCH_SCORE: u32 = 2;

/// Optional restrictions on the candidate set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub category: Option<String>,
    /// Admits articles tagged with this language or `Bilingual`.
    pub language: Option<Language>,
}

impl SearchFilters {
    pub fn for_language(language: Language) -> Self {
        Self {
            category: None,
            language: Some(language),
        }
    }

    /// Whether `article` belongs to the candidate set. Inactive articles never do.
    pub fn admits(&self, article: &KnowledgeArticle) -> bool {
        if !article.is_active {
            return false;
        }
        if let Some(category) = &self.category {
            if &article.category != category {
                return false;
            }
        }
        match self.language {
            Some(language) => article.language.admits(language),
            None => true,
        }
    }
}

/// Relevance of `article` for the already lower-cased `terms`.
pub fn score(terms: &[String], article: &KnowledgeArticle) -> u32 {
    let haystack = format!(
        "{} {} {}",
        article.title,
        article.question,
        article.keywords.0.join(", ")
    )
    .to_lowercase();

    terms.iter().filter(|term| haystack.contains(term.as_str())).count() as u32
}

/// Ranks `articles` against `query`.
///
/// Articles outside `filters` or scoring zero are dropped. The rest are
/// sorted by descending score; equal scores keep their input order. At most
/// `limit` results are returned.
pub fn search(
    query: &str,
    articles: &[KnowledgeArticle],
    filters: &SearchFilters,
    limit: usize,
) -> Vec<ScoredArticle> {
    let terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredArticle> = articles
        .iter()
        .filter(|article| filters.admits(article))
        .filter_map(|article| {
            let relevance_score = score(&terms, article);
            (relevance_score > 0).then(|| ScoredArticle {
                article: article.clone(),
                relevance_score,
            })
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
    scored.truncate(limit);
    scored
}

/// Whether the first result licenses a direct knowledge-base answer.
pub fn is_confident(results: &[ScoredArticle]) -> bool {
    results
        .first()
        .is_some_and(|top| top.relevance_score >= CONFIDENT_MATCH_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleLanguage;
    use sqlx::types::Json;

    fn article(id: &str, title: &str, keywords: &[&str]) -> KnowledgeArticle {
        KnowledgeArticle {
            id: id.to_string(),
            title: title.to_string(),
            question: String::new(),
            answer: format!("answer {}", id),
            answer_urdu: None,
            category: "Sales".to_string(),
            language: ArticleLanguage::Bilingual,
            keywords: Json(keywords.iter().map(|k| k.to_string()).collect()),
            usage_count: 0,
            helpful_count: 0,
            unhelpful_count: 0,
            related_entity_type: None,
            is_active: true,
        }
    }

    #[test]
    fn test_no_overlap_returns_empty() {
        let articles = vec![article("a", "Sales Invoice", &["billing"])];
        let results = search("zzz qqq", &articles, &SearchFilters::default(), 10);
        assert!(results.is_empty());
    }

    #[test]
    fn test_scores_count_terms_in_title_question_keywords() {
        let mut a = article("a", "Sales Invoice", &["billing"]);
        a.question = "How do I bill a customer?".to_string();
        let results = search("invoice billing customer", &[a], &SearchFilters::default(), 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relevance_score, 3);
    }

    #[test]
    fn test_sorted_descending_and_stable_on_ties() {
        let articles = vec![
            article("first", "Stock Entry", &[]),
            article("second", "Sales Invoice", &["stock"]),
            article("third", "Stock Ledger", &[]),
        ];
        let results = search("stock invoice", &articles, &SearchFilters::default(), 10);
        let ids: Vec<&str> = results.iter().map(|r| r.article.id.as_str()).collect();
        assert_eq!(ids, vec!["second", "first", "third"]);
    }

    #[test]
    fn test_inactive_articles_never_match() {
        let mut a = article("a", "Sales Invoice", &[]);
        a.is_active = false;
        assert!(search("sales invoice", &[a], &SearchFilters::default(), 10).is_empty());
    }

    #[test]
    fn test_language_filter_admits_bilingual() {
        let mut english = article("en", "Sales Invoice", &[]);
        english.language = ArticleLanguage::English;
        let bilingual = article("bi", "Sales Order", &[]);

        let results = search(
            "sales",
            &[english, bilingual],
            &SearchFilters::for_language(Language::Urdu),
            10,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].article.id, "bi");
    }

    #[test]
    fn test_category_filter_and_limit() {
        let mut hr = article("hr", "Sales training", &[]);
        hr.category = "HR".to_string();
        let articles = vec![hr, article("s1", "Sales A", &[]), article("s2", "Sales B", &[])];
        let filters = SearchFilters {
            category: Some("Sales".to_string()),
            language: None,
        };
        let results = search("sales", &articles, &filters, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].article.id, "s1");
    }

    #[test]
    fn test_confident_threshold() {
        let a = article("a", "Sales Invoice", &[]);
        let one = search("invoice", &[a.clone()], &SearchFilters::default(), 3);
        assert!(!is_confident(&one));
        let two = search("sales invoice", &[a], &SearchFilters::default(), 3);
        assert!(is_confident(&two));
        assert!(!is_confident(&[]));
    }
}
