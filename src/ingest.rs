//! Ingestion pipeline orchestration.
//!
//! Coordinates one document pass: package → walker → image extraction →
//! chunk assembly → image attachment. Images are written into a caller-owned
//! [`ImageStore`], so the store outlives the returned chunks for as long as
//! the caller keeps it.

use anyhow::{bail, Context as _, Result};
use std::io;
use std::path::Path;

use crate::attach::{attach_images, DEFAULT_LOOKAROUND};
use crate::chunker::{assemble, WindowParams};
use crate::config::Config;
use crate::context::Context;
use crate::images::{extract_images, ImageStore};
use crate::models::{Chunk, ImageRef};
use crate::ooxml::{OoxmlError, Package};
use crate::store;
use crate::walker;

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Package(#[from] OoxmlError),
    #[error("failed to prepare image directory: {0}")]
    Store(#[source] io::Error),
    #[error("failed to write image {filename}: {source}")]
    ImageWrite {
        filename: String,
        #[source]
        source: io::Error,
    },
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub chunk_size: usize,
    pub window: WindowParams,
    pub lookaround: i64,
    pub caption_window: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            window: WindowParams::default(),
            lookaround: DEFAULT_LOOKAROUND,
            caption_window: 3,
        }
    }
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunking.chunk_size,
            window: WindowParams {
                chunk_lookback: config.attachment.chunk_lookback,
                final_lookahead: config.attachment.final_lookahead,
            },
            lookaround: config.attachment.lookaround,
            caption_window: config.attachment.caption_window,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Ingest a DOCX package held in memory, writing its images into `store`.
pub fn try_ingest(
    bytes: &[u8],
    options: &IngestOptions,
    store: &ImageStore,
) -> Result<Vec<Chunk>, IngestError> {
    if options.chunk_size == 0 {
        return Err(IngestError::InvalidChunkSize);
    }

    let mut package = Package::open(bytes)?;
    let headers = package.header_paragraphs()?;
    let footers = package.footer_paragraphs()?;
    let walk = walker::walk(package.blocks(), &headers, &footers);

    let extracted = extract_images(&walk.flow, &mut package, store, options.caption_window)?;
    let images: Vec<ImageRef> = extracted
        .into_iter()
        .map(|e| {
            tracing::debug!(
                filename = %e.image.filename,
                content_type = %e.content_type,
                label = %e.image.label,
                "image extracted"
            );
            e.image
        })
        .collect();

    let mut context = Context::new();
    let drafts = assemble(&walk.content, options.chunk_size, &options.window, &mut context);
    let chunks = attach_images(drafts, &images, options.lookaround);

    tracing::info!(
        items = walk.content.len(),
        images = images.len(),
        chunks = chunks.len(),
        "document ingested"
    );
    Ok(chunks)
}

/// Like [`try_ingest`], but any failure is logged and yields no chunks.
pub fn ingest(bytes: &[u8], options: &IngestOptions, store: &ImageStore) -> Vec<Chunk> {
    match try_ingest(bytes, options, store) {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::error!(error = %e, "failed to process document");
            Vec::new()
        }
    }
}

/// `dxh ingest`: ingest a file, save the chunk set, print a summary.
pub fn run_ingest(
    config: &Config,
    file: &Path,
    chunk_size: Option<usize>,
    output: &Path,
    images_dir: Option<&Path>,
) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let mut options = IngestOptions::from_config(config);
    if let Some(size) = chunk_size {
        options = options.with_chunk_size(size);
    }

    let image_store = match images_dir {
        Some(dir) => ImageStore::in_dir(dir),
        None => ImageStore::temporary(),
    }
    .map_err(IngestError::Store)?;

    let chunks = ingest(&bytes, &options, &image_store);
    if chunks.is_empty() {
        bail!("No chunks produced from {}", file.display());
    }

    store::save_chunks(output, &chunks)?;

    let with_images = chunks.iter().filter(|c| c.metadata.has_images).count();
    let total_images: usize = chunks.iter().map(|c| c.metadata.image_count).sum();

    println!("ingest {}", file.display());
    println!("  chunks: {}", chunks.len());
    println!("  chunks with images: {}", with_images);
    println!("  attached images: {}", total_images);
    println!("  output: {}", output.display());
    if image_store.is_temporary() {
        println!("  images: discarded (pass --images-dir to keep them)");
    } else {
        println!("  images: {}", image_store.root().display());
    }

    let first = &chunks[0];
    let preview: String = first.text.chars().take(PREVIEW_CHARS).collect();
    println!();
    println!("--- Chunk {} ---", first.chunk_id);
    println!("{}", preview);
    for image in &first.images {
        println!("  [{}] {}", image.filename, image.label);
    }
    println!("ok");
    Ok(())
}
