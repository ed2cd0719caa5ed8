//! Image extraction.
//!
//! Resolves the image relationships recorded by the walker, numbers the
//! resolvable ones globally (1-based, in document order), labels each through
//! the caption resolver, and writes the payloads into an [`ImageStore`].
//!
//! Relationship ids that do not resolve to an internal part are skipped
//! silently and take no part in numbering or caption lookup. A paragraph all of
//! whose image references are unresolvable behaves like a plain text paragraph.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::caption::{resolve_label, Neighbor};
use crate::ingest::IngestError;
use crate::models::ImageRef;
use crate::ooxml::{Part, PartResolver};
use crate::walker::FlowParagraph;

/// Extensions kept as-is; anything else is written as `png`.
const KNOWN_EXTENSIONS: [&str; 5] = ["jpg", "png", "gif", "bmp", "webp"];
const DEFAULT_EXTENSION: &str = "png";

/// Directory that receives extracted image files for one ingestion.
///
/// A store created with [`ImageStore::temporary`] deletes its directory when
/// dropped, so the caller decides how long images live by deciding how long
/// the store lives. [`ImageStore::in_dir`] writes to a caller-owned directory
/// that is never cleaned up.
#[derive(Debug)]
pub struct ImageStore {
    root: PathBuf,
    _temp: Option<TempDir>,
}

impl ImageStore {
    pub fn temporary() -> io::Result<Self> {
        let temp = tempfile::Builder::new().prefix("dxh-images-").tempdir()?;
        Ok(Self {
            root: temp.path().to_path_buf(),
            _temp: Some(temp),
        })
    }

    pub fn in_dir(path: impl Into<PathBuf>) -> io::Result<Self> {
        let root = path.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, _temp: None })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_temporary(&self) -> bool {
        self._temp.is_some()
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    pub fn persist(&self, filename: &str, data: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_of(filename);
        fs::write(&path, data)?;
        Ok(path)
    }
}

/// An image written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub image: ImageRef,
    pub content_type: String,
    pub path: PathBuf,
}

/// File extension for an image content type.
pub fn extension_for(content_type: &str) -> &'static str {
    let subtype = content_type
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if subtype == "jpeg" {
        return "jpg";
    }
    match KNOWN_EXTENSIONS.iter().find(|ext| **ext == subtype) {
        Some(ext) => *ext,
        None => {
            tracing::warn!(content_type, "unknown image type, using default extension");
            DEFAULT_EXTENSION
        }
    }
}

enum Entry<'f> {
    Text(&'f str),
    Image { part: Part, own_text: &'f str, position: i64 },
}

/// Resolve, label, number and persist every image in the paragraph flow.
pub fn extract_images<R: PartResolver>(
    flow: &[FlowParagraph],
    resolver: &mut R,
    store: &ImageStore,
    caption_window: usize,
) -> Result<Vec<ExtractedImage>, IngestError> {
    let mut timeline: Vec<Entry<'_>> = Vec::new();

    for paragraph in flow {
        let mut resolved = 0usize;
        for rel_id in &paragraph.image_rels {
            match resolver.resolve_part(rel_id)? {
                Some(part) => {
                    resolved += 1;
                    timeline.push(Entry::Image {
                        part,
                        own_text: &paragraph.text,
                        position: paragraph.position,
                    });
                }
                None => tracing::debug!(rel_id = %rel_id, "skipping unresolvable image reference"),
            }
        }
        if resolved == 0 && !paragraph.in_table && !paragraph.text.is_empty() {
            timeline.push(Entry::Text(&paragraph.text));
        }
    }

    let neighbors: Vec<Neighbor<'_>> = timeline
        .iter()
        .map(|e| match e {
            Entry::Text(t) => Neighbor::Text(*t),
            Entry::Image { .. } => Neighbor::Image,
        })
        .collect();

    let mut images = Vec::new();
    let mut sequence: u32 = 1;
    for (index, entry) in timeline.iter().enumerate() {
        let Entry::Image {
            part,
            own_text,
            position,
        } = entry
        else {
            continue;
        };

        let label = resolve_label(own_text, &neighbors, index, caption_window, sequence);
        let filename = format!("image_{}.{}", sequence, extension_for(&part.content_type));
        let path = store
            .persist(&filename, &part.data)
            .map_err(|source| IngestError::ImageWrite {
                filename: filename.clone(),
                source,
            })?;

        images.push(ExtractedImage {
            image: ImageRef {
                filename,
                label,
                number: sequence,
                position: *position,
            },
            content_type: part.content_type.clone(),
            path,
        });
        sequence += 1;
    }

    Ok(images)
}
