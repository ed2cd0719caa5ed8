//! Answer generation.
//!
//! The [`AnswerGenerator`] trait is the seam between retrieval and whatever
//! model turns an evidence prompt into prose. Two providers are available:
//!
//! - **[`OpenAiGenerator`]** calls the OpenAI chat completions API
//!   (`OPENAI_API_KEY`).
//! - **[`GeminiGenerator`]** calls the Gemini `generateContent` API
//!   (`GEMINI_API_KEY`).
//!
//! `[llm] model` takes either an API model id or a display name
//! (`"GPT-4"`, `"GPT-4 Mini"`, `"Gemini 2.0 Flash"`).
//!
//! Transient failures are retried with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (other) → fail immediately
//! - Network errors → retry

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::config::{Config, LlmConfig};
use crate::prompt::{build_prompt, NO_RESULTS_ANSWER};
use crate::rerank::{rerank_images_with, RerankParams};
use crate::search::search_with_limit;
use crate::store;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

pub const SYSTEM_PROMPT: &str =
    "You are a documentation assistant. Answer based ONLY on provided documentation.";

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    fn model_name(&self) -> &str;

    /// Produce an answer for a fully built evidence prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Map a display name to the OpenAI model id; other values pass through.
pub fn openai_model_id(model: &str) -> &str {
    match model {
        "GPT-4" => "gpt-4",
        "GPT-4 Mini" => "gpt-4o-mini",
        other => other,
    }
}

/// Map a display name to the Gemini model id. Non-Gemini names fall back to
/// the default Gemini model.
pub fn gemini_model_id(model: &str) -> &str {
    match model {
        "Gemini 2.0 Flash" => DEFAULT_GEMINI_MODEL,
        other if other.starts_with("gemini") => other,
        _ => DEFAULT_GEMINI_MODEL,
    }
}

/// Shared request settings for both providers.
#[derive(Debug, Clone)]
struct RequestSettings {
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
    max_retries: u32,
}

impl RequestSettings {
    fn from_config(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }
}

pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    settings: RequestSettings,
}

impl OpenAiGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            api_key,
            model: openai_model_id(&config.model).to_string(),
            settings: RequestSettings::from_config(config),
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = self.request_body(prompt);
        let auth = format!("Bearer {}", self.api_key);
        let json = post_json_with_retry(
            "OpenAI",
            CHAT_COMPLETIONS_URL,
            ("Authorization", auth.as_str()),
            &body,
            &self.settings,
        )
        .await?;
        parse_chat_response(&json)
    }
}

pub struct GeminiGenerator {
    api_key: String,
    model: String,
    settings: RequestSettings,
}

impl GeminiGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;
        Ok(Self {
            api_key,
            model: gemini_model_id(&config.model).to_string(),
            settings: RequestSettings::from_config(config),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_tokens,
            },
        })
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = self.request_body(prompt);
        let json = post_json_with_retry(
            "Gemini",
            &self.endpoint(),
            ("X-goog-api-key", self.api_key.as_str()),
            &body,
            &self.settings,
        )
        .await?;
        parse_gemini_response(&json)
    }
}

/// POST `body` as JSON and return the parsed response, retrying 429/5xx and
/// network errors.
async fn post_json_with_retry(
    api: &str,
    url: &str,
    auth: (&str, &str),
    body: &serde_json::Value,
    settings: &RequestSettings,
) -> Result<serde_json::Value> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    let mut last_err = None;

    for attempt in 0..=settings.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::warn!(api, attempt, ?delay, "retrying answer generation");
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(url)
            .header(auth.0, auth.1)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "{} API error {}: {}",
                        api,
                        status,
                        body_text
                    ));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("{} API error {}: {}", api, status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} request failed after retries", api)))
}

/// Extract `choices[0].message.content` from a chat completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
}

/// Extract `candidates[0].content.parts[0].text` from a generateContent response.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/candidates/0/content/parts/0/text")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing candidate text"))
}

/// Create the generator named by `[llm] provider`.
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn AnswerGenerator>> {
    if !config.is_enabled() {
        bail!(
            "Answer generation is disabled. Set [llm] provider = \"openai\" or \"gemini\" in config."
        );
    }
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiGenerator::new(config)?)),
        "gemini" => Ok(Box::new(GeminiGenerator::new(config)?)),
        other => bail!("Unknown llm provider: '{}'", other),
    }
}

/// `dxh ask`: retrieve evidence, generate an answer, surface images.
pub async fn run_ask(
    config: &Config,
    query: &str,
    chunks_path: &Path,
    top_k: Option<usize>,
) -> Result<()> {
    let chunks = store::load_chunks(chunks_path)?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let results = search_with_limit(&chunks, query, top_k, config.retrieval.analytical_limit);

    if results.is_empty() {
        println!("{}", NO_RESULTS_ANSWER);
        return Ok(());
    }

    let generator = create_generator(&config.llm)?;
    let prompt = build_prompt(query, &results);
    tracing::info!(
        model = generator.model_name(),
        sections = results.len(),
        "generating answer"
    );
    let answer = generator.generate(&prompt).await?;

    let params = RerankParams {
        pool: config.retrieval.rerank_pool,
        min_chunk_score: config.retrieval.rerank_min_chunk_score,
        max_images: config.retrieval.max_images,
    };
    let images = rerank_images_with(&results, query, &params);

    println!("{}", answer);
    println!();
    println!("--- Evidence ({}) ---", results.len());
    for result in &results {
        let preview: String = result.chunk.text.chars().take(150).collect();
        println!(
            "{}. [{:.2}] chunk {}: {}",
            result.rank,
            result.score,
            result.chunk.chunk_id,
            preview.replace('\n', " ").trim()
        );
    }
    if !images.is_empty() {
        println!();
        println!("--- Images ({}) ---", images.len());
        for image in &images {
            println!("[{:.2}] {} ({})", image.score, image.label, image.filename);
        }
    }
    Ok(())
}
