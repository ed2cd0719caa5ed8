//! # DOCX Harness
//!
//! Turns a DOCX document into retrievable, labeled text+image chunks and
//! answers free-text queries against the chunk set with lexical scoring.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌──────────────┐   ┌───────────┐   ┌─────────┐
//! │  ooxml  │──▶│    walker    │──▶│  chunker  │──▶│ attach  │──▶ chunks.json
//! │ zip+xml │   │images+caption│   │ + context │   │ windows │
//! └─────────┘   └──────────────┘   └───────────┘   └─────────┘
//!
//! chunks.json ──▶ search (intent) ──▶ rerank ──▶ prompt ──▶ llm
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dxh ingest ./sop.docx --output chunks.json
//! dxh search "order limit for nevada" --chunks chunks.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`context`] | Jurisdiction, section and topic classification |
//! | [`ooxml`] | DOCX package reader |
//! | [`walker`] | Ordered content items and paragraph flow |
//! | [`caption`] | Caption parsing and resolution |
//! | [`images`] | Image extraction and the image store |
//! | [`chunker`] | Size-bounded chunk assembly |
//! | [`attach`] | Position-based image attachment |
//! | [`ingest`] | Ingestion pipeline orchestration |
//! | [`intent`] | Query intent detection |
//! | [`search`] | Lexical chunk scoring |
//! | [`rerank`] | Image reranking |
//! | [`prompt`] | Evidence prompts |
//! | [`llm`] | Answer generation |
//! | [`remote`] | Remote chunk sources |
//! | [`store`] | Chunk-set files |

pub mod attach;
pub mod caption;
pub mod chunker;
pub mod config;
pub mod context;
pub mod images;
pub mod ingest;
pub mod intent;
pub mod llm;
pub mod models;
pub mod ooxml;
pub mod prompt;
pub mod remote;
pub mod rerank;
pub mod search;
pub mod store;
pub mod walker;
