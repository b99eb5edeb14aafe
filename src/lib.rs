pub mod config;
pub mod error;
pub mod models;
pub mod github;
pub mod analysis;
pub mod report;

pub use config::{Config, PipelineConfig, RepositoryFilter};
pub use error::{Error, FetchFailure, Result};
pub use github::{GitHubClient, QueryClient, RateLimiter};
pub use analysis::{OpenPrTriage, ReportPipeline, WeeklySettings};
pub use report::ReportSet;
