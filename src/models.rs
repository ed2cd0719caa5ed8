//! Core data models used throughout the harness.
//!
//! These types represent the content items, chunks, and ranked results that
//! flow through the ingestion and retrieval pipeline. [`Chunk`] serializes to
//! the stable chunk-set shape shared with remote chunk sources:
//!
//! ```json
//! { "chunk_id": 0, "text": "...",
//!   "images": [{ "filename": "image_1.png", "label": "Image 1", "number": 1, "position": 4 }],
//!   "metadata": { "states": ["OH"], "sections": [], "topics": ["PRICING"],
//!                 "word_count": 120, "has_images": true, "image_count": 1 } }
//! ```

use serde::{Deserialize, Serialize};

use crate::context::{Jurisdiction, Section, Topic};

/// Position assigned to header text so it sorts ahead of the body.
pub const HEADER_POSITION: i64 = -1;
/// Position assigned to footer text so it sorts after the body.
pub const FOOTER_POSITION: i64 = 999;

/// Where a [`ContentItem`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Paragraph,
    Table,
    Header,
    Footer,
}

/// A non-empty run of document text tagged with its traversal position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub kind: ContentKind,
    pub text: String,
    pub position: i64,
}

impl ContentItem {
    pub fn new(kind: ContentKind, text: impl Into<String>, position: i64) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}

/// An extracted image as referenced from a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    pub label: String,
    /// Global 1-based sequence number within one ingestion.
    pub number: u32,
    pub position: i64,
}

/// Classification snapshot and counters attached to a chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub states: Vec<Jurisdiction>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub has_images: bool,
    #[serde(default)]
    pub image_count: usize,
}

/// A bounded text span with attached images, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: usize,
    pub text: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// A chunk that survived scoring, with its score and 1-based rank.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f64,
    pub rank: usize,
}

/// An image surfaced by the reranker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedImage {
    pub filename: String,
    pub label: String,
    pub score: f64,
    pub chunk_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_serializes_stable_field_names() {
        let chunk = Chunk {
            chunk_id: 2,
            text: "Ohio pricing".to_string(),
            images: vec![ImageRef {
                filename: "image_1.png".to_string(),
                label: "Image 1".to_string(),
                number: 1,
                position: 4,
            }],
            metadata: ChunkMetadata {
                states: vec![Jurisdiction::Oh],
                sections: vec![Section::Rise],
                topics: vec![Topic::Pricing],
                word_count: 2,
                has_images: true,
                image_count: 1,
            },
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["chunk_id"], 2);
        assert_eq!(json["images"][0]["number"], 1);
        assert_eq!(json["metadata"]["states"][0], "OH");
        assert_eq!(json["metadata"]["sections"][0], "RISE");
        assert_eq!(json["metadata"]["topics"][0], "PRICING");
        assert_eq!(json["metadata"]["has_images"], true);
    }

    #[test]
    fn test_chunk_metadata_defaults_when_missing() {
        let chunk: Chunk = serde_json::from_str(r#"{"chunk_id": 0, "text": "hello"}"#).unwrap();
        assert!(chunk.images.is_empty());
        assert_eq!(chunk.metadata, ChunkMetadata::default());
    }
}
