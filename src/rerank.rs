//! Image reranking over the top scored chunks.
//!
//! Only the first `pool` results are considered, and only chunks scoring above
//! `min_chunk_score` contribute images. Each image is scored on its label:
//!
//! ```text
//! relevance = 2.0 * |query words ∩ label words|
//!           + 1.5 * |query concepts ∩ label concepts|
//!           + chunk score
//! ```
//!
//! An image is kept when its relevance reaches 1.5 if the query named any
//! concept, otherwise 1.0. An image attached to two eligible chunks is scored
//! and returned once per chunk.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{RankedImage, ScoredChunk};

const WORD_WEIGHT: f64 = 2.0;
const CONCEPT_WEIGHT: f64 = 1.5;
const CHUNK_WEIGHT: f64 = 1.0;
const LABEL_BONUS: f64 = 0.0;
const CONCEPT_THRESHOLD: f64 = 1.5;
const PLAIN_THRESHOLD: f64 = 1.0;

/// Named keyword clusters. A concept is present when any keyword is a substring.
pub const CONCEPTS: &[(&str, &[&str])] = &[
    ("order", &["order", "ordering", "purchase"]),
    ("form", &["form", "template", "document"]),
    ("invoice", &["invoice", "billing", "payment"]),
    ("delivery", &["delivery", "shipping", "schedule"]),
    ("battery", &["battery", "batteries"]),
    ("pricing", &["price", "pricing", "cost"]),
    ("substitution", &["sub", "substitution", "batch"]),
    ("rise", &["rise", "internal"]),
    ("regular", &["regular", "wholesale"]),
    ("limit", &["limit", "maximum", "max"]),
    ("note", &["note", "notes", "required"]),
    ("split", &["split", "splitting"]),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankParams {
    pub pool: usize,
    pub min_chunk_score: f64,
    pub max_images: usize,
}

impl Default for RerankParams {
    fn default() -> Self {
        Self {
            pool: 3,
            min_chunk_score: 0.3,
            max_images: 3,
        }
    }
}

/// Concepts present in lower-cased `text`, in table order.
pub fn concepts_in(text: &str) -> HashSet<&'static str> {
    CONCEPTS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(name, _)| *name)
        .collect()
}

pub fn rerank_images(scored: &[ScoredChunk<'_>], query: &str) -> Vec<RankedImage> {
    rerank_images_with(scored, query, &RerankParams::default())
}

pub fn rerank_images_with(
    scored: &[ScoredChunk<'_>],
    query: &str,
    params: &RerankParams,
) -> Vec<RankedImage> {
    let query_lower = query.to_lowercase();
    let query_words: HashSet<&str> = query_lower.split_whitespace().collect();
    let query_concepts = concepts_in(&query_lower);
    let threshold = if query_concepts.is_empty() {
        PLAIN_THRESHOLD
    } else {
        CONCEPT_THRESHOLD
    };

    let mut ranked = Vec::new();
    for result in scored.iter().take(params.pool) {
        if result.chunk.images.is_empty() || result.score <= params.min_chunk_score {
            continue;
        }
        for image in &result.chunk.images {
            let label_lower = image.label.to_lowercase();
            let label_words: HashSet<&str> = label_lower.split_whitespace().collect();
            let word_overlap = query_words.intersection(&label_words).count();
            let concept_overlap = query_concepts
                .intersection(&concepts_in(&label_lower))
                .count();

            let relevance = WORD_WEIGHT * word_overlap as f64
                + CONCEPT_WEIGHT * concept_overlap as f64
                + CHUNK_WEIGHT * result.score
                + LABEL_BONUS;

            if relevance >= threshold {
                ranked.push(RankedImage {
                    filename: image.filename.clone(),
                    label: image.label.clone(),
                    score: relevance,
                    chunk_score: result.score,
                });
            }
        }
    }

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked.truncate(params.max_images);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ChunkMetadata, ImageRef};

    fn chunk_with(id: usize, labels: &[&str]) -> Chunk {
        let images: Vec<ImageRef> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| ImageRef {
                filename: format!("image_{}_{}.png", id, i),
                label: label.to_string(),
                number: i as u32 + 1,
                position: i as i64,
            })
            .collect();
        Chunk {
            chunk_id: id,
            text: String::new(),
            metadata: ChunkMetadata {
                has_images: !images.is_empty(),
                image_count: images.len(),
                ..ChunkMetadata::default()
            },
            images,
        }
    }

    fn scored(chunk: &Chunk, score: f64, rank: usize) -> ScoredChunk<'_> {
        ScoredChunk { chunk, score, rank }
    }

    #[test]
    fn test_concepts_in() {
        let found = concepts_in("battery invoice template");
        assert!(found.contains("battery"));
        assert!(found.contains("invoice"));
        assert!(found.contains("form"));
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_relevance_formula() {
        let c = chunk_with(0, &["Image 1: Battery invoice"]);
        let results = vec![scored(&c, 0.8, 1)];
        let images = rerank_images(&results, "battery invoice example");
        assert_eq!(images.len(), 1);
        // 2 words, 2 concepts, chunk score 0.8
        assert!((images[0].score - (4.0 + 3.0 + 0.8)).abs() < 1e-9);
        assert_eq!(images[0].chunk_score, 0.8);
    }

    #[test]
    fn test_low_scoring_chunks_contribute_nothing() {
        let c = chunk_with(0, &["Order form"]);
        let results = vec![scored(&c, 0.3, 1)];
        assert!(rerank_images(&results, "order form").is_empty());
    }

    #[test]
    fn test_only_first_three_results_considered() {
        let chunks: Vec<Chunk> = (0..4).map(|i| chunk_with(i, &["Order form"])).collect();
        let results: Vec<ScoredChunk<'_>> = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| scored(c, 2.0 - i as f64 * 0.1, i + 1))
            .collect();
        let images = rerank_images_with(
            &results,
            "order form",
            &RerankParams {
                max_images: 10,
                ..RerankParams::default()
            },
        );
        assert_eq!(images.len(), 3);
        assert!(images.iter().all(|i| !i.filename.starts_with("image_3")));
    }

    #[test]
    fn test_threshold_depends_on_query_concepts() {
        let c = chunk_with(0, &["Image 4"]);
        let results = vec![scored(&c, 1.2, 1)];
        assert_eq!(rerank_images(&results, "where is ohio").len(), 1);
        assert!(rerank_images(&results, "ohio order").is_empty());
    }

    #[test]
    fn test_sorted_and_capped_without_dedup() {
        let a = chunk_with(0, &["Order form", "Delivery schedule", "Plain"]);
        let b = chunk_with(1, &["Order form"]);
        let mut shared = b.clone();
        shared.images[0].filename = a.images[0].filename.clone();
        let results = vec![scored(&a, 1.0, 1), scored(&shared, 0.9, 2)];
        let images = rerank_images(&results, "order form delivery");
        assert_eq!(images.len(), 3);
        assert!(images.windows(2).all(|w| w[0].score >= w[1].score));
        let dupes = images
            .iter()
            .filter(|i| i.filename == a.images[0].filename)
            .count();
        assert_eq!(dupes, 2);
    }
}
