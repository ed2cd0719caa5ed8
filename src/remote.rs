//! Remote chunk sources.
//!
//! A [`ChunkSource`] returns a validated chunk set from somewhere other than
//! the local ingester. [`GitHubSource`] reads a chunk-set file from a GitHub
//! repository through the contents API (`GITHUB_TOKEN` required).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use std::time::Duration;

use crate::config::{Config, RemoteConfig};
use crate::models::Chunk;
use crate::store;

const GITHUB_API: &str = "https://api.github.com";
const GITHUB_WEB_PREFIX: &str = "https://github.com/";

#[async_trait]
pub trait ChunkSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch and validate the chunk set stored at `path`.
    async fn fetch(&self, path: &str) -> Result<Vec<Chunk>>;
}

/// `owner/repo` pair parsed from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

/// Parse `https://github.com/<owner>/<repo>[/...]` (or a bare `owner/repo`).
pub fn parse_repo_url(url: &str) -> Result<RepoRef> {
    let trimmed = url.trim();
    let rest = trimmed.strip_prefix(GITHUB_WEB_PREFIX).unwrap_or(trimmed);
    let mut parts = rest.split('/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => Ok(RepoRef {
            owner: owner.to_string(),
            repo: repo.trim_end_matches(".git").to_string(),
        }),
        _ => bail!("Invalid GitHub URL: '{}'", url),
    }
}

pub struct GitHubSource {
    repo: RepoRef,
    token: String,
    timeout_secs: u64,
}

impl GitHubSource {
    pub fn new(repo: RepoRef, config: &RemoteConfig) -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| anyhow::anyhow!("GITHUB_TOKEN environment variable not set"))?;
        Ok(Self {
            repo,
            token,
            timeout_secs: config.timeout_secs,
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            GITHUB_API,
            self.repo.owner,
            self.repo.repo,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ChunkSource for GitHubSource {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Chunk>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;
        let url = self.contents_url(path);
        tracing::debug!(url = %url, "fetching chunk set");

        let response = client
            .get(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", concat!("dxh/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("GitHub API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let content = decode_contents(&json)?;
        store::parse_chunks(&content)
    }
}

/// Decode the base64 `content` field of a contents API response.
fn decode_contents(json: &serde_json::Value) -> Result<String> {
    let encoded = json
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid GitHub response: missing content"))?;
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned)
        .context("Invalid GitHub response: content is not base64")?;
    String::from_utf8(bytes).context("Invalid GitHub response: content is not UTF-8")
}

/// `dxh fetch`: download a chunk set and save it locally.
pub async fn run_fetch(
    config: &Config,
    repo_url: &str,
    path: Option<&str>,
    output: &Path,
) -> Result<()> {
    let repo = parse_repo_url(repo_url)?;
    let path = path.unwrap_or(config.remote.default_path.as_str());
    let source = GitHubSource::new(repo.clone(), &config.remote)?;

    tracing::info!(source = source.name(), path, "fetching chunk set");
    let chunks = source.fetch(path).await?;
    store::save_chunks(output, &chunks)?;

    println!("fetch {}/{}:{}", repo.owner, repo.repo, path);
    println!("  chunks: {}", chunks.len());
    println!("  output: {}", output.display());
    println!("ok");
    Ok(())
}
