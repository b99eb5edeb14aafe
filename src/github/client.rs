use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::github::queries::{Page, Query, Variables};
use crate::github::rate_limiter::RateLimiter;

pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Executes one page of a paginated query. The paginator drives the cursor;
/// implementations only run the request and decode the connection.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, query: &Query, variables: &Variables) -> Result<Page>;
}

pub struct GitHubClient {
    client: Client,
    rate_limiter: RateLimiter,
    endpoint: String,
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a Variables,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl GitHubClient {
    pub fn new(token: &str, endpoint: &str, rate_limiter: RateLimiter) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("contribstats/0.1"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            rate_limiter,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl QueryClient for GitHubClient {
    async fn query(&self, query: &Query, variables: &Variables) -> Result<Page> {
        self.rate_limiter.wait().await;
        tracing::debug!(query = query.name, "Executing GraphQL query");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&GraphQlRequest {
                query: query.document,
                variables,
            })
            .send()
            .await?;
        self.rate_limiter.update_from_headers(response.headers()).await;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized(format!(
                "{}: token was rejected ({})",
                query.name, status
            )));
        }
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(Error::RateLimited(retry_after));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GitHubApi(format!(
                "{} failed: {} - {}",
                query.name, status, body
            )));
        }

        let body: GraphQlResponse = response.json().await?;
        if !body.errors.is_empty() {
            let message = body
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            let not_found = body
                .errors
                .iter()
                .any(|e| e.error_type.as_deref() == Some("NOT_FOUND"));
            return Err(if not_found {
                Error::RepoNotFound(message)
            } else {
                Error::GitHubApi(format!("{}: {}", query.name, message))
            });
        }

        let data = body
            .data
            .ok_or_else(|| Error::ParseError(format!("{}: response has no data", query.name)))?;
        query.extract_page(data)
    }
}
