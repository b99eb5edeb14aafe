use std::env;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::github::DEFAULT_GRAPHQL_URL;
use crate::models::{RepoKind, Repository};

#[derive(Clone)]
pub struct Config {
    pub github_token: Option<String>,
    pub graphql_url: String,
    pub concurrency_limit: usize,
    pub request_pause: Duration,
    pub requests_per_minute: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("graphql_url", &self.graphql_url)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("request_pause", &self.request_pause)
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let github_token = env::var("GITHUB_TOKEN")
            .or_else(|_| env::var("GITHUB_COMMUNITY_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty());

        let graphql_url =
            env::var("GITHUB_GRAPHQL_URL").unwrap_or_else(|_| DEFAULT_GRAPHQL_URL.to_string());

        let concurrency_limit = env::var("CONCURRENCY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let request_pause = env::var("REQUEST_PAUSE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(2));

        let requests_per_minute = env::var("REQUESTS_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            github_token,
            graphql_url,
            concurrency_limit,
            request_pause,
            requests_per_minute,
        }
    }

    /// The token, or a user-facing error explaining how to supply one.
    pub fn token(&self) -> Result<&str> {
        self.github_token.as_deref().ok_or_else(|| {
            Error::Config(
                "missing GitHub token: pass --token or set GITHUB_TOKEN".to_string(),
            )
        })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub concurrency_limit: usize,
    pub request_pause: Duration,
    pub show_progress: bool,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit,
            request_pause: config.request_pause,
            show_progress: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryEntry {
    #[serde(default)]
    github_namespace: Option<String>,
    #[serde(alias = "tool_name")]
    repo_name: String,
}

/// Parse a tracked repository list: a JSON array of
/// `{ "github_namespace": .., "repo_name" | "tool_name": .. }` objects.
pub fn parse_repositories(
    json: &str,
    kind: RepoKind,
    default_namespace: &str,
) -> Result<Vec<Repository>> {
    let entries: Vec<RepositoryEntry> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let namespace = entry
                .github_namespace
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| default_namespace.to_string());
            Repository::new(namespace, entry.repo_name, kind)
        })
        .collect())
}

/// Load a tracked repository list from a local path or an http(s) URL.
pub async fn load_repositories(
    source: &str,
    kind: RepoKind,
    default_namespace: &str,
) -> Result<Vec<Repository>> {
    let json = if source.starts_with("http://") || source.starts_with("https://") {
        tracing::info!("Downloading repository list: {}", source);
        reqwest::get(source).await?.error_for_status()?.text().await?
    } else {
        tracing::info!("Reading repository list: {}", source);
        tokio::fs::read_to_string(source).await?
    };
    let repos = parse_repositories(&json, kind, default_namespace)?;
    tracing::info!("Loaded {} {} repositories from {}", repos.len(), kind, source);
    Ok(repos)
}

/// Keeps repositories whose name matches a pattern; keeps all without one.
#[derive(Debug, Clone, Default)]
pub struct RepositoryFilter {
    pattern: Option<Regex>,
}

impl RepositoryFilter {
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        Ok(Self {
            pattern: pattern.map(Regex::new).transpose()?,
        })
    }

    pub fn apply(&self, repos: Vec<Repository>) -> Vec<Repository> {
        match &self.pattern {
            Some(pattern) => repos
                .into_iter()
                .filter(|r| pattern.is_match(&r.name))
                .collect(),
            None => repos,
        }
    }
}
