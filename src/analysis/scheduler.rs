use std::future::Future;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{Error, FetchFailure, Result};
use crate::models::Repository;

pub const DEFAULT_CONCURRENCY: usize = 2;

/// Runs one fetch per repository, at most `concurrency` at a time.
/// Running more than a couple at once gets the token temporarily locked out.
pub struct FanOutScheduler {
    concurrency: usize,
    show_progress: bool,
}

/// Joined outcome of a fan-out: successful results in input order, and the
/// repositories whose fetch failed.
#[derive(Debug)]
pub struct FanOut<T> {
    pub completed: Vec<(Repository, T)>,
    pub failures: Vec<FetchFailure>,
}

impl<T> FanOut<T> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_repositories(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.repository.as_str()).collect()
    }
}

impl<T: IntoIterator> FanOut<T> {
    /// Concatenate every repository's results, keeping each repository's
    /// own order.
    pub fn flatten(self) -> (Vec<T::Item>, Vec<FetchFailure>) {
        let items = self
            .completed
            .into_iter()
            .flat_map(|(_, items)| items)
            .collect();
        (items, self.failures)
    }
}

impl FanOutScheduler {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            show_progress: true,
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Schedule `fetch` for every repository and wait for all of them.
    ///
    /// A failing or panicking fetch is recorded under `label` and never
    /// cancels the others. Dropping the returned future aborts every task
    /// still in flight.
    pub async fn run<T, F, Fut>(
        &self,
        repositories: Vec<Repository>,
        label: &str,
        fetch: F,
    ) -> FanOut<T>
    where
        T: Send + 'static,
        F: Fn(Repository) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let fetch = Arc::new(fetch);
        let pb = self.progress_bar(repositories.len() as u64, label);

        let mut tasks = JoinSet::new();
        for (index, repo) in repositories.iter().enumerate() {
            let sem = semaphore.clone();
            let fetch = fetch.clone();
            let repo = repo.clone();
            let pb = pb.clone();

            tasks.spawn(async move {
                let outcome = match sem.acquire_owned().await {
                    Ok(_permit) => {
                        tracing::debug!("Fetching: {}", repo);
                        fetch(repo).await
                    }
                    Err(_) => Err(Error::TaskAborted("worker pool closed".to_string())),
                };
                pb.inc(1);
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<T>>> = repositories.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => tracing::error!("{} task did not finish: {}", label, e),
            }
        }
        semaphore.close();
        tasks.shutdown().await;
        pb.finish_and_clear();

        let mut completed = Vec::new();
        let mut failures = Vec::new();
        for (repo, outcome) in repositories.into_iter().zip(outcomes) {
            let outcome = outcome
                .unwrap_or_else(|| Err(Error::TaskAborted(format!("{} task panicked", label))));
            match outcome {
                Ok(result) => completed.push((repo, result)),
                Err(source) => {
                    tracing::warn!(
                        transport = source.is_transport(),
                        "{}: {} failed: {}",
                        repo,
                        label,
                        source
                    );
                    failures.push(FetchFailure {
                        repository: repo.full_name(),
                        query: label.to_string(),
                        source,
                    });
                }
            }
        }

        tracing::info!(
            "Fetched {} for {} repositories ({} failed)",
            label,
            completed.len(),
            failures.len()
        );
        FanOut {
            completed,
            failures,
        }
    }

    fn progress_bar(&self, len: u64, label: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(label.to_string());
        pb
    }
}

impl Default for FanOutScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}
