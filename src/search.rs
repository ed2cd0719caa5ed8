//! Lexical chunk scoring.
//!
//! A chunk's score is the sum of:
//!
//! | Signal | Contribution |
//! |--------|--------------|
//! | token overlap | `|query ∩ chunk| / max(|query|, 1)` over whitespace token sets |
//! | substring hit | `+0.3` per unique query token longer than 3 chars found anywhere in the text |
//! | jurisdiction | `+0.5` if the chunk's states contain the query jurisdiction |
//! | section | `+0.3` if the chunk's sections contain the query section |
//! | topics | `+0.4` per query topic present in the chunk's topics |
//! | visual request | `+0.3` if the query mentions a visual keyword and the chunk has images |
//! | length | `+0.1` if the text is longer than 200 chars |
//!
//! Chunks scoring `<= 0` are dropped. The rest are stably sorted by score,
//! descending, and truncated. Analytical queries replace the requested count
//! with `min(analytical_limit, chunks.len())`.

use anyhow::Result;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use crate::config::Config;
use crate::intent::{is_analytical, unique_tokens, QueryIntent};
use crate::models::{Chunk, ScoredChunk};
use crate::store;

pub const DEFAULT_ANALYTICAL_LIMIT: usize = 15;

const SUBSTRING_MIN_CHARS: usize = 3;
const SUBSTRING_BOOST: f64 = 0.3;
const JURISDICTION_BOOST: f64 = 0.5;
const SECTION_BOOST: f64 = 0.3;
const TOPIC_BOOST: f64 = 0.4;
const VISUAL_BOOST: f64 = 0.3;
const LENGTH_BOOST: f64 = 0.1;
const LONG_TEXT_CHARS: usize = 200;
const PREVIEW_CHARS: usize = 150;

/// Query words that ask for visual material.
pub const VISUAL_KEYWORDS: [&str; 4] = ["image", "show", "example", "visual"];

/// A query analysed once and scored against many chunks.
#[derive(Debug, Clone)]
pub struct PreparedQuery<'q> {
    pub lower: &'q str,
    pub tokens: Vec<&'q str>,
    pub intent: QueryIntent,
    pub wants_visuals: bool,
    pub analytical: bool,
}

impl<'q> PreparedQuery<'q> {
    pub fn new(lower: &'q str) -> Self {
        Self {
            lower,
            tokens: unique_tokens(lower),
            intent: QueryIntent::from_lowercase(lower),
            wants_visuals: VISUAL_KEYWORDS.iter().any(|k| lower.contains(k)),
            analytical: is_analytical(lower),
        }
    }
}

/// Score one chunk against a prepared query.
pub fn score_chunk(chunk: &Chunk, query: &PreparedQuery<'_>) -> f64 {
    let text_lower = chunk.text.to_lowercase();
    let text_tokens: HashSet<&str> = text_lower.split_whitespace().collect();
    let metadata = &chunk.metadata;

    let overlap = query
        .tokens
        .iter()
        .filter(|t| text_tokens.contains(*t))
        .count();
    let mut score = overlap as f64 / query.tokens.len().max(1) as f64;

    for token in &query.tokens {
        if token.chars().count() > SUBSTRING_MIN_CHARS && text_lower.contains(token) {
            score += SUBSTRING_BOOST;
        }
    }

    if let Some(j) = query.intent.jurisdiction {
        if metadata.states.contains(&j) {
            score += JURISDICTION_BOOST;
        }
    }
    if let Some(s) = query.intent.section {
        if metadata.sections.contains(&s) {
            score += SECTION_BOOST;
        }
    }
    for topic in &query.intent.topics {
        if metadata.topics.contains(topic) {
            score += TOPIC_BOOST;
        }
    }

    if query.wants_visuals && metadata.has_images {
        score += VISUAL_BOOST;
    }
    if chunk.text.chars().count() > LONG_TEXT_CHARS {
        score += LENGTH_BOOST;
    }

    score
}

/// Rank `chunks` against `query`, returning at most `top_k` results.
pub fn search<'a>(chunks: &'a [Chunk], query: &str, top_k: usize) -> Vec<ScoredChunk<'a>> {
    search_with_limit(chunks, query, top_k, DEFAULT_ANALYTICAL_LIMIT)
}

/// [`search`] with an explicit cap for analytical queries.
pub fn search_with_limit<'a>(
    chunks: &'a [Chunk],
    query: &str,
    top_k: usize,
    analytical_limit: usize,
) -> Vec<ScoredChunk<'a>> {
    let lower = query.to_lowercase();
    let prepared = PreparedQuery::new(&lower);

    let limit = if prepared.analytical {
        analytical_limit.min(chunks.len())
    } else {
        top_k
    };

    let mut scored: Vec<(f64, &Chunk)> = chunks
        .iter()
        .map(|chunk| (score_chunk(chunk, &prepared), chunk))
        .filter(|(score, _)| *score > 0.0)
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.truncate(limit);

    tracing::debug!(
        query = %query,
        analytical = prepared.analytical,
        limit,
        results = scored.len(),
        "scored chunks"
    );

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, chunk))| ScoredChunk {
            chunk,
            score,
            rank: i + 1,
        })
        .collect()
}

/// `dxh search`: rank a saved chunk set and print the results.
pub fn run_search(
    config: &Config,
    query: &str,
    chunks_path: &Path,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let chunks = store::load_chunks(chunks_path)?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let results = search_with_limit(&chunks, query, top_k, config.retrieval.analytical_limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for result in &results {
        let meta = &result.chunk.metadata;
        println!(
            "{}. [{:.2}] chunk {}",
            result.rank, result.score, result.chunk.chunk_id
        );
        if !meta.states.is_empty() {
            let states: Vec<&str> = meta.states.iter().map(|s| s.code()).collect();
            println!("    states: {}", states.join(", "));
        }
        if !meta.topics.is_empty() {
            let topics: Vec<&str> = meta.topics.iter().map(|t| t.code()).collect();
            println!("    topics: {}", topics.join(", "));
        }
        if meta.has_images {
            println!("    images: {}", meta.image_count);
        }
        let preview: String = result.chunk.text.chars().take(PREVIEW_CHARS).collect();
        println!("    excerpt: \"{}\"", preview.replace('\n', " ").trim());
        println!();
    }

    Ok(())
}
