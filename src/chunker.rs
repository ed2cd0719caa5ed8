//! Greedy size-bounded chunk assembler.
//!
//! Folds content items, in traversal order, into a text buffer. Before an item
//! is appended the buffer is finalized as a [`Chunk`] if the item would push it
//! past `chunk_size` characters; the item is then appended regardless. A chunk
//! is therefore either at most `chunk_size` characters long or consists of a
//! single oversized item. Chunk ids are contiguous from 0.
//!
//! Every item updates the running [`Context`] before the size check, and each
//! chunk snapshots the context as it stands when the chunk is finalized.
//!
//! Each chunk also records an approximate position window used later for image
//! attachment: `[last - lookback, last]` for chunks finalized mid-stream and
//! `[last - lookback, last + lookahead]` for the trailing chunk, where `last` is
//! the position of the last item placed in the chunk.

use crate::context::Context;
use crate::models::{Chunk, ChunkMetadata, ContentItem};

/// Heuristic window offsets (all in traversal positions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    pub chunk_lookback: i64,
    pub final_lookahead: i64,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            chunk_lookback: 10,
            final_lookahead: 10,
        }
    }
}

/// Inclusive range of traversal positions a chunk is taken to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionWindow {
    pub start: i64,
    pub end: i64,
}

/// A finalized chunk that has not had images attached yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftChunk {
    pub chunk: Chunk,
    pub window: PositionWindow,
}

/// Assemble content items into chunks, updating `context` along the way.
pub fn assemble(
    items: &[ContentItem],
    chunk_size: usize,
    params: &WindowParams,
    context: &mut Context,
) -> Vec<DraftChunk> {
    let mut drafts = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;
    let mut last_position: i64 = 0;

    for item in items {
        if item.text.is_empty() {
            continue;
        }
        context.observe(&item.text);

        let item_chars = item.text.chars().count();
        if buf_chars + item_chars > chunk_size && !buf.is_empty() {
            let window = PositionWindow {
                start: last_position - params.chunk_lookback,
                end: last_position,
            };
            drafts.push(make_draft(drafts.len(), &buf, context, window));
            buf.clear();
            buf_chars = 0;
        }

        buf.push_str(&item.text);
        buf.push(' ');
        buf_chars += item_chars + 1;
        last_position = item.position;
    }

    if !buf.trim().is_empty() {
        let window = PositionWindow {
            start: last_position - params.chunk_lookback,
            end: last_position + params.final_lookahead,
        };
        drafts.push(make_draft(drafts.len(), &buf, context, window));
    }

    drafts
}

fn make_draft(id: usize, buf: &str, context: &Context, window: PositionWindow) -> DraftChunk {
    let text = buf.trim().to_string();
    tracing::debug!(
        chunk_id = id,
        chars = text.chars().count(),
        start = window.start,
        end = window.end,
        "finalized chunk"
    );
    DraftChunk {
        chunk: Chunk {
            chunk_id: id,
            images: Vec::new(),
            metadata: ChunkMetadata {
                states: context.states(),
                sections: context.sections(),
                topics: context.topics(),
                word_count: text.split_whitespace().count(),
                has_images: false,
                image_count: 0,
            },
            text,
        },
        window,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Jurisdiction, Topic};
    use crate::models::ContentKind;

    fn para(text: &str, position: i64) -> ContentItem {
        ContentItem::new(ContentKind::Paragraph, text, position)
    }

    fn run(items: &[ContentItem], chunk_size: usize) -> Vec<DraftChunk> {
        let mut ctx = Context::new();
        assemble(items, chunk_size, &WindowParams::default(), &mut ctx)
    }

    #[test]
    fn test_small_input_single_chunk() {
        let drafts = run(&[para("Hello,", 0), para("world!", 1)], 800);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].chunk.chunk_id, 0);
        assert_eq!(drafts[0].chunk.text, "Hello, world!");
        assert_eq!(drafts[0].chunk.metadata.word_count, 2);
        assert_eq!(drafts[0].window, PositionWindow { start: -9, end: 11 });
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(run(&[], 800).is_empty());
    }

    #[test]
    fn test_context_snapshot_taken_at_finalization() {
        let items = [
            para("Ohio menu price list", 0),
            para("Battery invoices are separate", 1),
            para("Maryland notes", 2),
        ];
        let drafts = run(&items, 30);
        assert_eq!(drafts.len(), 3);

        // The item that triggers finalization has already updated the context.
        let m0 = &drafts[0].chunk.metadata;
        assert_eq!(drafts[0].chunk.text, "Ohio menu price list");
        assert_eq!(m0.states, vec![Jurisdiction::Oh]);
        assert_eq!(m0.topics, vec![Topic::Batteries]);
        assert_eq!(drafts[0].window, PositionWindow { start: -10, end: 0 });

        let m1 = &drafts[1].chunk.metadata;
        assert_eq!(m1.states, vec![Jurisdiction::Md]);
        assert_eq!(m1.topics, vec![Topic::Batteries]);
        assert_eq!(drafts[1].window, PositionWindow { start: -9, end: 1 });

        assert_eq!(drafts[2].chunk.text, "Maryland notes");
        assert_eq!(drafts[2].window, PositionWindow { start: -8, end: 12 });
    }

    #[test]
    fn test_chunk_ids_contiguous() {
        let items: Vec<ContentItem> = (0..50)
            .map(|i| para(&format!("Paragraph number {}.", i), i))
            .collect();
        let drafts = run(&items, 40);
        assert!(drafts.len() > 1);
        for (i, d) in drafts.iter().enumerate() {
            assert_eq!(d.chunk.chunk_id, i, "Index mismatch at position {}", i);
        }
    }

    #[test]
    fn test_chunks_bounded_unless_single_oversized_item() {
        let words = ["alpha", "beta gamma", "delta epsilon zeta", "eta", "theta iota kappa lambda"];
        let items: Vec<ContentItem> = (0..40)
            .map(|i| para(&words[i % words.len()].repeat(1 + i % 3), i as i64))
            .collect();
        for size in [1, 5, 12, 25, 60, 200] {
            let drafts = run(&items, size);
            for d in &drafts {
                let text = &d.chunk.text;
                assert!(!text.trim().is_empty());
                assert!(
                    text.chars().count() <= size || items.iter().any(|i| &i.text == text),
                    "chunk of {} chars exceeds {}",
                    text.chars().count(),
                    size
                );
            }
            let total: usize = drafts.iter().map(|d| d.chunk.metadata.word_count).sum();
            let expected: usize = items.iter().map(|i| i.text.split_whitespace().count()).sum();
            assert_eq!(total, expected, "words lost at size {}", size);
        }
    }

    #[test]
    fn test_deterministic() {
        let items = [para("Alpha", 0), para("Beta", 1), para("Gamma", 2), para("Delta", 3)];
        let c1 = run(&items, 8);
        let c2 = run(&items, 8);
        assert_eq!(c1, c2);
    }
}
