//! Evidence prompts for the answer generator.
//!
//! Normal queries get the ranked chunk texts under `RELEVANT DOCUMENTATION`.
//! Analytical queries get a fuller layout with per-section metadata and a
//! closing summary of every state and topic the evidence covers.

use std::collections::BTreeSet;

use crate::intent::is_analytical;
use crate::models::ScoredChunk;

/// Answer given when the scorer finds nothing.
pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find relevant information for your query. Please try rephrasing your question.";

/// Build the prompt for `query` from ranked evidence.
pub fn build_prompt(query: &str, results: &[ScoredChunk<'_>]) -> String {
    if is_analytical(&query.to_lowercase()) {
        analytical_prompt(query, results)
    } else {
        documentation_prompt(query, results)
    }
}

fn section_heading(index: usize, score: f64) -> String {
    format!("\n--- Section {} (Score: {:.2}) ---", index + 1, score)
}

fn documentation_prompt(query: &str, results: &[ScoredChunk<'_>]) -> String {
    let mut parts = vec![format!(
        "USER QUESTION: {}\n\nRELEVANT DOCUMENTATION:",
        query
    )];
    for (i, result) in results.iter().enumerate() {
        parts.push(section_heading(i, result.score));
        parts.push(result.chunk.text.clone());
    }
    parts.join("\n")
}

fn analytical_prompt(query: &str, results: &[ScoredChunk<'_>]) -> String {
    let mut parts = vec![format!(
        "USER QUESTION: {}\n\nCOMPREHENSIVE DATA FOR ANALYSIS:",
        query
    )];
    let mut states: BTreeSet<&str> = BTreeSet::new();
    let mut topics: BTreeSet<&str> = BTreeSet::new();

    for (i, result) in results.iter().enumerate() {
        let meta = &result.chunk.metadata;
        parts.push(section_heading(i, result.score));

        if !meta.states.is_empty() {
            let codes: Vec<&str> = meta.states.iter().map(|s| s.code()).collect();
            parts.push(format!("STATES: {}", codes.join(", ")));
            states.extend(codes);
        }
        if !meta.topics.is_empty() {
            let codes: Vec<&str> = meta.topics.iter().map(|t| t.code()).collect();
            parts.push(format!("TOPICS: {}", codes.join(", ")));
            topics.extend(codes);
        }
        parts.push(format!("CONTENT: {}", result.chunk.text));
    }

    parts.push("\n--- SUMMARY FOR ANALYSIS ---".to_string());
    parts.push(format!("TOTAL SECTIONS FOUND: {}", results.len()));
    parts.push(format!(
        "STATES MENTIONED: {}",
        states.into_iter().collect::<Vec<_>>().join(", ")
    ));
    parts.push(format!(
        "TOPICS COVERED: {}",
        topics.into_iter().collect::<Vec<_>>().join(", ")
    ));
    parts.push(
        "\nINSTRUCTION: Please analyze ALL the provided sections to answer the user's question."
            .to_string(),
    );
    parts.join("\n")
}
