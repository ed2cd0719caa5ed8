//! Query analysis: tokens, analytical intent, and metadata intent.

use crate::context::{Jurisdiction, Section, Topic};

/// Phrases marking a question that needs a broad view of the document.
pub const ANALYTICAL_PHRASES: [&str; 16] = [
    "how many",
    "what states",
    "which state",
    "highest",
    "lowest",
    "compare",
    "all states",
    "total",
    "maximum",
    "minimum",
    "list all",
    "differences",
    "across states",
    "between states",
    "summary",
    "overview",
];

/// Query keywords for each topic. Every matching topic is kept.
pub const QUERY_TOPIC_KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::Pricing, &["price", "pricing", "cost", "discount", "menu"]),
    (Topic::Batteries, &["battery", "batteries", "separate", "invoice"]),
    (Topic::BatchSub, &["batch", "sub", "substitution", "split"]),
    (Topic::DeliveryDate, &["delivery", "date", "schedule"]),
    (Topic::OrderLimit, &["limit", "maximum", "max", "unit"]),
    (Topic::LessAvailable, &["less", "available", "partial", "shortage"]),
];

const RISE_KEYWORDS: [&str; 2] = ["rise", "internal"];
const REGULAR_KEYWORDS: [&str; 2] = ["regular", "wholesale"];

/// Metadata a query is asking about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryIntent {
    pub jurisdiction: Option<Jurisdiction>,
    pub section: Option<Section>,
    pub topics: Vec<Topic>,
}

impl QueryIntent {
    /// Extract intent from an already lower-cased query.
    pub fn from_lowercase(lower: &str) -> Self {
        let section = if RISE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Some(Section::Rise)
        } else if REGULAR_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Some(Section::Regular)
        } else {
            None
        };

        let topics = QUERY_TOPIC_KEYWORDS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(topic, _)| *topic)
            .collect();

        Self {
            jurisdiction: Jurisdiction::detect_in_query(lower),
            section,
            topics,
        }
    }

    pub fn from_query(query: &str) -> Self {
        Self::from_lowercase(&query.to_lowercase())
    }
}

/// Whether a lower-cased query asks an analytical question.
pub fn is_analytical(lower: &str) -> bool {
    ANALYTICAL_PHRASES.iter().any(|p| lower.contains(p))
}

/// Unique whitespace-separated tokens in first-occurrence order.
pub fn unique_tokens(lower: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = Vec::new();
    for token in lower.split_whitespace() {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}
