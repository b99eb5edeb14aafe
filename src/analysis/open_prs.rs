use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::models::{AuthorAssociation, Comment, PullRequest, Repository};

pub const DEFAULT_BOT_PATTERN: &str = "^codecov";

/// One line of the open pull request triage report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenPrRow {
    pub tool: String,
    pub address: String,
    pub pr: u64,
    pub url: String,
    pub age: i64,
    pub owner: String,
    pub author_association: AuthorAssociation,
    pub title: String,
    pub last_comment: String,
    pub by: String,
    pub age_comment: i64,
}

/// Builds triage rows. Comments whose author matches `bot_authors` are
/// skipped when looking for the last human comment.
pub struct OpenPrTriage {
    bot_authors: Regex,
    markup: Regex,
}

fn age_in_days(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    ((now - then).num_seconds() as f64 / 86_400.0).round() as i64
}

impl OpenPrTriage {
    pub fn new(bot_pattern: &str) -> Result<Self> {
        Ok(Self {
            bot_authors: Regex::new(bot_pattern)?,
            markup: Regex::new(r"</?[^>]*>")?,
        })
    }

    pub fn is_bot(&self, login: &str) -> bool {
        self.bot_authors.is_match(login)
    }

    pub fn strip_markup(&self, body: &str) -> String {
        self.markup.replace_all(body, "").trim().to_string()
    }

    pub fn row(
        &self,
        repo: &Repository,
        pr: &PullRequest,
        comments: &[Comment],
        now: DateTime<Utc>,
    ) -> OpenPrRow {
        let latest = comments.iter().max_by_key(|c| c.created_at);
        let latest_human = comments
            .iter()
            .filter(|c| !self.is_bot(&c.author))
            .max_by_key(|c| c.created_at);

        let (last_comment, by) = match (latest, latest_human) {
            (None, _) => ("0 comments".to_string(), String::new()),
            (Some(_), None) => ("No previous comment other than bot".to_string(), String::new()),
            (Some(_), Some(comment)) => (self.strip_markup(&comment.body), comment.author.clone()),
        };

        OpenPrRow {
            tool: repo.name.clone(),
            address: repo.url(),
            pr: pr.number,
            url: pr.url.clone(),
            age: age_in_days(now, pr.created_at),
            owner: pr.author.clone(),
            author_association: pr.author_association,
            title: pr.title.clone(),
            last_comment,
            by,
            age_comment: latest.map(|c| age_in_days(now, c.updated_at)).unwrap_or(0),
        }
    }
}
