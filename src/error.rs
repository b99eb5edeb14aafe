use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Rate limit exceeded, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Authorization rejected: {0}")]
    Unauthorized(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Pagination error: {0}")]
    Pagination(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch task did not complete: {0}")]
    TaskAborted(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A per-repository fetch that failed. Carries enough context to tell the
/// user which repository and which query broke, without aborting the run.
#[derive(Error, Debug)]
#[error("{query} for {repository} failed: {source}")]
pub struct FetchFailure {
    pub repository: String,
    pub query: String,
    #[source]
    pub source: Error,
}

impl Error {
    /// Failures caused by the remote side rather than by bad input.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::RateLimited(_) | Error::Network(_) | Error::Unauthorized(_) | Error::GitHubApi(_)
        )
    }
}
