//! Chunk-set files.
//!
//! A chunk set is a JSON array of [`Chunk`] objects. `dxh ingest` writes one,
//! and `search`, `ask` and `chunks` read one back, as does the remote fetcher
//! after decoding a file from a repository. This module also pages through a
//! loaded set for `dxh chunks`.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::Chunk;

/// Parse a chunk set from JSON text.
pub fn parse_chunks(json: &str) -> Result<Vec<Chunk>> {
    serde_json::from_str(json).context("Invalid chunk set: expected a JSON array of chunks")
}

pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk set: {}", path.display()))?;
    let chunks = parse_chunks(&json)?;
    tracing::debug!(path = %path.display(), chunks = chunks.len(), "loaded chunk set");
    Ok(chunks)
}

/// Write `chunks` as pretty JSON, creating parent directories as needed.
pub fn save_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(chunks)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write chunk set: {}", path.display()))?;
    Ok(())
}

/// One page of a filtered chunk set.
#[derive(Debug)]
pub struct ChunkPage<'a> {
    pub chunks: Vec<&'a Chunk>,
    /// Matches across all pages.
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
}

/// Filter by case-insensitive substring, then slice out 1-based `page`.
pub fn page_chunks<'a>(
    chunks: &'a [Chunk],
    filter: Option<&str>,
    page: usize,
    per_page: usize,
) -> ChunkPage<'a> {
    let needle = filter.map(str::to_lowercase).filter(|n| !n.is_empty());
    let matching: Vec<&Chunk> = chunks
        .iter()
        .filter(|c| match &needle {
            Some(n) => c.text.to_lowercase().contains(n.as_str()),
            None => true,
        })
        .collect();

    let per_page = per_page.max(1);
    let page = page.max(1);
    let total = matching.len();
    let chunks = matching
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    ChunkPage {
        chunks,
        total,
        page,
        per_page,
        pages: total.div_ceil(per_page),
    }
}

/// `dxh chunks`: print one page of a saved chunk set.
pub fn run_chunks(path: &Path, filter: Option<&str>, page: usize, per_page: usize) -> Result<()> {
    let chunks = load_chunks(path)?;
    let view = page_chunks(&chunks, filter, page, per_page);

    println!(
        "chunks: {} (page {} of {}, {} per page)",
        view.total, view.page, view.pages, view.per_page
    );
    for chunk in &view.chunks {
        let meta = &chunk.metadata;
        println!();
        println!("--- Chunk {} ({} words) ---", chunk.chunk_id, meta.word_count);
        if !meta.states.is_empty() || !meta.topics.is_empty() {
            let states: Vec<&str> = meta.states.iter().map(|s| s.code()).collect();
            let topics: Vec<&str> = meta.topics.iter().map(|t| t.code()).collect();
            println!("states: [{}] topics: [{}]", states.join(", "), topics.join(", "));
        }
        println!("{}", chunk.text);
        for image in &chunk.images {
            println!("  [{}] {}", image.filename, image.label);
        }
    }
    Ok(())
}
