use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub attachment: AttachmentConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}

/// Position heuristics used to pair images with captions and chunks.
#[derive(Debug, Deserialize, Clone)]
pub struct AttachmentConfig {
    #[serde(default = "default_lookaround")]
    pub lookaround: i64,
    #[serde(default = "default_chunk_window")]
    pub chunk_lookback: i64,
    #[serde(default = "default_chunk_window")]
    pub final_lookahead: i64,
    #[serde(default = "default_caption_window")]
    pub caption_window: usize,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            lookaround: default_lookaround(),
            chunk_lookback: default_chunk_window(),
            final_lookahead: default_chunk_window(),
            caption_window: default_caption_window(),
        }
    }
}

fn default_lookaround() -> i64 {
    3
}
fn default_chunk_window() -> i64 {
    10
}
fn default_caption_window() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_analytical_limit")]
    pub analytical_limit: usize,
    #[serde(default = "default_rerank_pool")]
    pub rerank_pool: usize,
    #[serde(default = "default_rerank_min_chunk_score")]
    pub rerank_min_chunk_score: f64,
    #[serde(default = "default_max_images")]
    pub max_images: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            analytical_limit: default_analytical_limit(),
            rerank_pool: default_rerank_pool(),
            rerank_min_chunk_score: default_rerank_min_chunk_score(),
            max_images: default_max_images(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_analytical_limit() -> usize {
    15
}
fn default_rerank_pool() -> usize {
    3
}
fn default_rerank_min_chunk_score() -> f64 {
    0.3
}
fn default_max_images() -> usize {
    MAX_IMAGES_LIMIT
}

/// Upper bound on images surfaced with one answer.
pub const MAX_IMAGES_LIMIT: usize = 3;

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_path")]
    pub default_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            default_path: default_remote_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_remote_path() -> String {
    "output/hybrid_chunks.json".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    if config.attachment.lookaround < 0
        || config.attachment.chunk_lookback < 0
        || config.attachment.final_lookahead < 0
    {
        anyhow::bail!("attachment offsets must be >= 0");
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.analytical_limit == 0 {
        anyhow::bail!("retrieval.analytical_limit must be >= 1");
    }

    if config.retrieval.rerank_pool == 0 {
        anyhow::bail!("retrieval.rerank_pool must be >= 1");
    }
    if config.retrieval.rerank_min_chunk_score < 0.0 {
        anyhow::bail!("retrieval.rerank_min_chunk_score must be >= 0.0");
    }
    if config.retrieval.max_images > MAX_IMAGES_LIMIT {
        anyhow::bail!("retrieval.max_images must be <= {}", MAX_IMAGES_LIMIT);
    }

    match config.llm.provider.as_str() {
        "disabled" | "openai" | "gemini" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, openai or gemini.",
            other
        ),
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}
