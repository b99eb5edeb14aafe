use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use contribstats::analysis::DEFAULT_BOT_PATTERN;
use contribstats::config::load_repositories;
use contribstats::models::{RepoKind, Repository};
use contribstats::report::assignment_json;
use contribstats::{
    Config, FetchFailure, GitHubClient, OpenPrTriage, PipelineConfig, QueryClient, RateLimiter,
    ReportPipeline, ReportSet, RepositoryFilter, WeeklySettings,
};

const DEFAULT_TOOLS_URL: &str = "https://puppetlabs.github.io/iac/tools.json";

#[derive(Parser, Debug)]
#[command(name = "contribstats")]
#[command(version = "0.1.0")]
#[command(about = "Pull request and comment activity reports for GitHub repositories")]
struct Cli {
    /// GitHub OAuth token
    #[arg(short = 't', long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Repositories fetched at the same time
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Only include repositories whose name matches this regex
    #[arg(short, long, global = true)]
    filter: Option<String>,

    /// Exit with an error, writing nothing, if any repository failed
    #[arg(long, global = true)]
    strict: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Weekly closed / merged / commented counts plus the PR and comment tables
    Weekly {
        /// Module list (path or URL)
        #[arg(long)]
        modules: Option<String>,

        /// Tool list (path or URL)
        #[arg(long)]
        tools: Option<String>,

        /// Namespace for list entries that do not name one
        #[arg(long, default_value = "puppetlabs")]
        namespace: String,

        /// Reference date, DD-MM-YYYY or YYYY-MM-DD (defaults to today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Number of weeks to report
        #[arg(long, default_value = "12")]
        weeks: usize,

        /// Day every week ends on
        #[arg(long, default_value = "sunday", value_parser = parse_weekday)]
        week_ends_on: Weekday,

        /// Fetch comments updated since this date instead of the first week's start
        #[arg(long, value_parser = parse_timestamp)]
        comments_since: Option<DateTime<Utc>>,

        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Per-assignee count of a team's recently updated pull requests
    Assigned {
        #[arg(long, default_value = "puppetlabs")]
        organization: String,

        #[arg(long, default_value = "modules")]
        team: String,

        /// Trailing range in days
        #[arg(long, default_value = "7")]
        days: i64,
    },

    /// Open pull requests of the tracked tools with their last human comment
    OpenPrs {
        /// Tool list (path or URL)
        #[arg(long, default_value = DEFAULT_TOOLS_URL)]
        tools: String,

        /// Comment authors to skip when looking for the last comment (regex)
        #[arg(long, default_value = DEFAULT_BOT_PATTERN)]
        skip_comment_author: String,

        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| format!("invalid date '{}', expected DD-MM-YYYY or YYYY-MM-DD", value))
}

fn parse_weekday(value: &str) -> Result<Weekday, String> {
    value
        .parse()
        .map_err(|_| format!("invalid weekday '{}'", value))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    parse_date(value).map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

fn missing_options(flags: &str) -> anyhow::Result<()> {
    println!("Missing options: {}", flags);
    Cli::command().print_help()?;
    Ok(())
}

/// Log every failed repository; in strict mode turn any failure into an error.
fn check_failures(failures: &[FetchFailure], strict: bool) -> anyhow::Result<()> {
    for failure in failures {
        tracing::warn!("{}", failure);
    }
    if strict && !failures.is_empty() {
        anyhow::bail!(
            "{} repositories failed, no reports written",
            failures.len()
        );
    }
    Ok(())
}

async fn load_lists(
    modules: Option<&str>,
    tools: Option<&str>,
    namespace: &str,
) -> anyhow::Result<Vec<Repository>> {
    let mut repos = Vec::new();
    if let Some(source) = modules {
        repos.extend(load_repositories(source, RepoKind::Module, namespace).await?);
    }
    if let Some(source) = tools {
        repos.extend(load_repositories(source, RepoKind::Tool, namespace).await?);
    }
    Ok(repos)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads GITHUB_TOKEN
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("contribstats={}", level).parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    let mut config = Config::from_env();
    if let Some(token) = cli.token.clone() {
        config.github_token = Some(token);
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency_limit = concurrency;
    }
    tracing::debug!("{:?}", config);

    let token = match config.token() {
        Ok(token) => token.to_string(),
        Err(e) => {
            tracing::error!("{}", e);
            return missing_options("-t");
        }
    };
    let filter = RepositoryFilter::new(cli.filter.as_deref())?;

    let client: Arc<dyn QueryClient> = Arc::new(GitHubClient::new(
        &token,
        &config.graphql_url,
        RateLimiter::new(config.requests_per_minute),
    )?);
    let pipeline = ReportPipeline::new(client, PipelineConfig::from(&config));

    match cli.command {
        Command::Weekly {
            modules,
            tools,
            namespace,
            date,
            weeks,
            week_ends_on,
            comments_since,
            output_dir,
        } => {
            if modules.is_none() && tools.is_none() {
                return missing_options("--modules or --tools");
            }
            let repos = filter.apply(load_lists(modules.as_deref(), tools.as_deref(), &namespace).await?);
            let settings = WeeklySettings {
                reference_date: date.unwrap_or_else(|| Utc::now().date_naive()),
                week_ends_on,
                weeks,
                comments_since,
            };

            let report = pipeline.weekly_activity(repos, &settings).await?;
            check_failures(&report.failures, cli.strict)?;
            let reports = ReportSet::weekly(&report)?;
            reports.write_to(&output_dir)?;
        }

        Command::Assigned {
            organization,
            team,
            days,
        } => {
            let report = pipeline
                .assignments(&organization, &team, days, Utc::now())
                .await?;
            check_failures(&report.failures, cli.strict)?;
            tracing::info!(
                "{} PRs updated in the last {} days across {} repositories",
                report.tally.prs_total,
                days,
                report.repositories
            );
            println!("{}", assignment_json(&report.tally)?);
        }

        Command::OpenPrs {
            tools,
            skip_comment_author,
            output_dir,
        } => {
            let triage = OpenPrTriage::new(&skip_comment_author)?;
            let repos = filter.apply(load_repositories(&tools, RepoKind::Tool, "puppetlabs").await?);

            let now = Utc::now();
            let report = pipeline.open_pull_requests(repos, triage, now).await?;
            check_failures(&report.failures, cli.strict)?;
            let reports = ReportSet::open_prs(&report, now)?;
            reports.write_to(&output_dir)?;
        }
    }

    Ok(())
}
