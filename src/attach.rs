//! Position-based image attachment.
//!
//! A chunk receives every image whose position lies in its window widened by
//! `lookaround` on both sides. Windows of neighbouring chunks may overlap, in
//! which case the same image is attached to each of them; an image outside
//! every widened window is attached to none.

use crate::chunker::DraftChunk;
use crate::models::{Chunk, ImageRef};

/// Default widening applied to each side of a chunk window.
pub const DEFAULT_LOOKAROUND: i64 = 3;

/// Attach images to drafts and return the finished chunks.
pub fn attach_images(drafts: Vec<DraftChunk>, images: &[ImageRef], lookaround: i64) -> Vec<Chunk> {
    drafts
        .into_iter()
        .map(|draft| {
            let lo = draft.window.start - lookaround;
            let hi = draft.window.end + lookaround;
            let mut attached: Vec<ImageRef> = images
                .iter()
                .filter(|img| (lo..=hi).contains(&img.position))
                .cloned()
                .collect();
            attached.sort_by_key(|img| img.position);

            let mut chunk = draft.chunk;
            chunk.metadata.has_images = !attached.is_empty();
            chunk.metadata.image_count = attached.len();
            chunk.images = attached;
            chunk
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::PositionWindow;
    use crate::models::ChunkMetadata;

    fn draft(id: usize, start: i64, end: i64) -> DraftChunk {
        DraftChunk {
            chunk: Chunk {
                chunk_id: id,
                text: format!("chunk {}", id),
                images: Vec::new(),
                metadata: ChunkMetadata::default(),
            },
            window: PositionWindow { start, end },
        }
    }

    fn image(number: u32, position: i64) -> ImageRef {
        ImageRef {
            filename: format!("image_{}.png", number),
            label: format!("Image {}", number),
            number,
            position,
        }
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        let images = [image(1, -3), image(2, 13), image(3, 14), image(4, -4)];
        let chunks = attach_images(vec![draft(0, 0, 10)], &images, 3);
        let numbers: Vec<u32> = chunks[0].images.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(chunks[0].metadata.has_images);
        assert_eq!(chunks[0].metadata.image_count, 2);
    }

    #[test]
    fn test_overlapping_windows_duplicate_images() {
        let images = [image(1, 12)];
        let chunks = attach_images(vec![draft(0, 0, 10), draft(1, 5, 15)], &images, 3);
        assert_eq!(chunks[0].images, vec![image(1, 12)]);
        assert_eq!(chunks[1].images, vec![image(1, 12)]);
    }

    #[test]
    fn test_orphaned_image_attached_nowhere() {
        let images = [image(1, 500)];
        let chunks = attach_images(vec![draft(0, -10, 0), draft(1, -9, 11)], &images, 3);
        assert!(chunks.iter().all(|c| c.images.is_empty() && !c.metadata.has_images));
    }

    #[test]
    fn test_images_sorted_by_position() {
        let images = [image(2, 7), image(1, 2), image(3, 5)];
        let chunks = attach_images(vec![draft(0, 0, 10)], &images, 3);
        let positions: Vec<i64> = chunks[0].images.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![2, 5, 7]);
    }
}
