use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};

use crate::analysis::open_prs::{OpenPrRow, OpenPrTriage};
use crate::analysis::scheduler::FanOutScheduler;
use crate::analysis::tally::{tally_assignments, AssignmentTally};
use crate::analysis::windows::{bucket, weekly_windows, Activity, TimeWindow, WeeklyBucket};
use crate::config::PipelineConfig;
use crate::error::{Error, FetchFailure, Result};
use crate::github::fetch::{self, PrFilter};
use crate::github::QueryClient;
use crate::models::{Comment, PullRequest, RepoKind, Repository};

/// Longest weekly report accepted, about ten years.
pub const MAX_WEEKS: usize = 520;
/// Longest trailing range accepted for the assignment snapshot.
pub const MAX_DAYS: i64 = 3650;

#[derive(Debug, Clone)]
pub struct WeeklySettings {
    /// Date the most recent window is anchored from.
    pub reference_date: NaiveDate,
    /// Weekday every window ends on.
    pub week_ends_on: Weekday,
    pub weeks: usize,
    /// Earliest comment activity to fetch; defaults to the oldest window's start.
    pub comments_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct RepoActivity {
    pub pull_requests: Vec<PullRequest>,
    pub comments: Vec<Comment>,
}

#[derive(Debug)]
pub struct WeeklyReport {
    pub repositories: Vec<(Repository, RepoActivity)>,
    pub weeks: Vec<WeeklyBucket>,
    pub failures: Vec<FetchFailure>,
}

#[derive(Debug)]
pub struct AssignmentReport {
    pub repositories: usize,
    pub tally: AssignmentTally,
    pub failures: Vec<FetchFailure>,
}

#[derive(Debug)]
pub struct OpenPrReport {
    pub rows: Vec<OpenPrRow>,
    pub failures: Vec<FetchFailure>,
}

pub struct ReportPipeline {
    client: Arc<dyn QueryClient>,
    scheduler: FanOutScheduler,
    config: PipelineConfig,
}

impl ReportPipeline {
    pub fn new(client: Arc<dyn QueryClient>, config: PipelineConfig) -> Self {
        let mut scheduler = FanOutScheduler::new(config.concurrency_limit);
        if !config.show_progress {
            scheduler = scheduler.without_progress();
        }
        Self {
            client,
            scheduler,
            config,
        }
    }

    /// Closed, merged and commented counts per week, plus the PRs and
    /// comments they were computed from.
    pub async fn weekly_activity(
        &self,
        repos: Vec<Repository>,
        settings: &WeeklySettings,
    ) -> Result<WeeklyReport> {
        if settings.weeks > MAX_WEEKS {
            return Err(Error::Config(format!(
                "{} weeks requested, at most {} are supported",
                settings.weeks, MAX_WEEKS
            )));
        }
        let windows = weekly_windows(settings.reference_date, settings.week_ends_on, settings.weeks);
        let first_window: &TimeWindow = windows
            .first()
            .ok_or_else(|| Error::Config("at least one week must be requested".to_string()))?;
        let since = settings.comments_since.unwrap_or(first_window.start);

        tracing::info!(
            "Collecting activity for {} repositories, {} weeks ending {}",
            repos.len(),
            windows.len(),
            windows[windows.len() - 1].ending_on()
        );

        let client = self.client.clone();
        let pause = self.config.request_pause;
        let fan_out = self
            .scheduler
            .run(repos, "pull requests and comments", move |repo| {
                let client = client.clone();
                async move {
                    let pull_requests =
                        fetch::pull_requests(client.as_ref(), &repo, PrFilter::All).await?;
                    tracing::info!("{}: got {} PRs", repo, pull_requests.len());
                    let mut comments =
                        fetch::comments_since(client.as_ref(), &repo, &pull_requests, since, pause)
                            .await?;
                    comments.extend(fetch::issue_comments_since(client.as_ref(), &repo, since).await?);
                    tracing::info!("{}: got {} comments", repo, comments.len());
                    Ok::<_, Error>(RepoActivity {
                        pull_requests,
                        comments,
                    })
                }
            })
            .await;

        let activity = Activity::from_records(
            fan_out
                .completed
                .iter()
                .flat_map(|(_, a)| a.pull_requests.iter()),
            fan_out.completed.iter().flat_map(|(_, a)| a.comments.iter()),
        );
        let weeks = bucket(&activity, &windows);

        Ok(WeeklyReport {
            repositories: fan_out.completed,
            weeks,
            failures: fan_out.failures,
        })
    }

    /// PRs updated within the last `days` across a team's repositories, and
    /// how many each assignee holds.
    pub async fn assignments(
        &self,
        organization: &str,
        team: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<AssignmentReport> {
        if !(0..=MAX_DAYS).contains(&days) {
            return Err(Error::Config(format!(
                "days must be between 0 and {}, got {}",
                MAX_DAYS, days
            )));
        }
        let repos =
            fetch::team_repositories(self.client.as_ref(), organization, team, RepoKind::Module)
                .await?;
        let repositories = repos.len();
        let since = now - Duration::days(days);

        let client = self.client.clone();
        let fan_out = self
            .scheduler
            .run(repos, "assigned pull requests", move |repo| {
                let client = client.clone();
                async move { fetch::pull_requests_updated_since(client.as_ref(), &repo, since).await }
            })
            .await;

        let (pull_requests, failures) = fan_out.flatten();
        Ok(AssignmentReport {
            repositories,
            tally: tally_assignments(&pull_requests, since),
            failures,
        })
    }

    /// One triage row per open PR of each repository.
    pub async fn open_pull_requests(
        &self,
        repos: Vec<Repository>,
        triage: OpenPrTriage,
        now: DateTime<Utc>,
    ) -> Result<OpenPrReport> {
        let client = self.client.clone();
        let pause = self.config.request_pause;
        let triage = Arc::new(triage);

        let fan_out = self
            .scheduler
            .run(repos, "open pull requests", move |repo| {
                let client = client.clone();
                let triage = triage.clone();
                async move {
                    let pull_requests =
                        fetch::pull_requests(client.as_ref(), &repo, PrFilter::Open).await?;
                    let comments = fetch::comments_since(
                        client.as_ref(),
                        &repo,
                        &pull_requests,
                        DateTime::<Utc>::MIN_UTC,
                        pause,
                    )
                    .await?;

                    let mut by_pr: HashMap<u64, Vec<Comment>> = HashMap::new();
                    for comment in comments {
                        by_pr.entry(comment.number).or_default().push(comment);
                    }
                    Ok::<_, Error>(pull_requests
                        .iter()
                        .map(|pr| {
                            let comments = by_pr.get(&pr.number).map(Vec::as_slice).unwrap_or(&[]);
                            triage.row(&repo, pr, comments, now)
                        })
                        .collect::<Vec<_>>())
                }
            })
            .await;

        let (mut rows, failures) = fan_out.flatten();
        rows.sort_by(|a, b| a.tool.cmp(&b.tool).then(a.pr.cmp(&b.pr)));
        Ok(OpenPrReport { rows, failures })
    }
}
