pub mod client;
pub mod fetch;
pub mod nodes;
pub mod paginator;
pub mod queries;
pub mod rate_limiter;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{GitHubClient, QueryClient, DEFAULT_GRAPHQL_URL};
pub use fetch::PrFilter;
pub use paginator::Paginator;
pub use queries::{Page, Query, Variables};
pub use rate_limiter::RateLimiter;
