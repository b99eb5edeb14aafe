//! CSV tables behind the weekly report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::{ActivityKind, LabelSummary, WeeklyBucket};
use crate::error::{Error, Result};
use crate::models::{Comment, PullRequest, Repository};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const PR_COLUMNS: [&str; 14] = [
    "repo",
    "url",
    "author",
    "author_association",
    "state",
    "created_at",
    "merged_at",
    "closed_at",
    "type",
    "breaking_count",
    "feature_count",
    "bugfix_count",
    "maintenance_count",
    "all_labels_count",
];

pub const COMMENT_COLUMNS: [&str; 7] = [
    "repo",
    "comment_url",
    "author",
    "author_association",
    "created_at",
    "updated_at",
    "type",
];

pub const WEEKLY_COLUMNS: [&str; 4] = ["week_ending_on", "closed", "commented", "merged"];

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct PrRow {
    repo: String,
    url: String,
    author: String,
    author_association: String,
    state: String,
    created_at: String,
    merged_at: String,
    closed_at: String,
    kind: String,
    breaking_count: u64,
    feature_count: u64,
    bugfix_count: u64,
    maintenance_count: u64,
    all_labels_count: u64,
}

impl PrRow {
    pub fn new(repo: &Repository, pr: &PullRequest) -> Self {
        let labels = LabelSummary::from_labels(&pr.labels);
        Self {
            repo: repo.full_name(),
            url: pr.url.clone(),
            author: pr.author.clone(),
            author_association: pr.author_association.to_string(),
            state: pr.state().to_string(),
            created_at: timestamp(Some(pr.created_at)),
            merged_at: timestamp(pr.merged_at),
            closed_at: timestamp(pr.closed_at),
            kind: repo.kind.to_string(),
            breaking_count: labels.breaking(),
            feature_count: labels.feature(),
            bugfix_count: labels.bugfix(),
            maintenance_count: labels.maintenance(),
            all_labels_count: labels.all,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentRow {
    repo: String,
    comment_url: String,
    author: String,
    author_association: String,
    created_at: String,
    updated_at: String,
    kind: String,
}

impl CommentRow {
    pub fn new(repo: &Repository, comment: &Comment) -> Self {
        Self {
            repo: repo.full_name(),
            comment_url: comment.url.clone(),
            author: comment.author.clone(),
            author_association: comment.author_association.to_string(),
            created_at: timestamp(Some(comment.created_at)),
            updated_at: timestamp(Some(comment.updated_at)),
            kind: repo.kind.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WeeklyRow {
    week_ending_on: String,
    closed: u64,
    commented: u64,
    merged: u64,
}

impl From<&WeeklyBucket> for WeeklyRow {
    fn from(bucket: &WeeklyBucket) -> Self {
        Self {
            week_ending_on: bucket.window.ending_on().format("%Y-%m-%d").to_string(),
            closed: bucket.count(ActivityKind::Closed),
            commented: bucket.count(ActivityKind::Commented),
            merged: bucket.count(ActivityKind::Merged),
        }
    }
}

/// Render rows as CSV under `columns`. The header is written even when
/// there are no rows.
pub fn to_csv<R: Serialize>(columns: &[&str], rows: &[R]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}
