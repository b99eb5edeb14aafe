use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{LabelCategory, PullRequest};

/// Counter keyed by category. Reading a key that was never counted yields 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tally<K: Ord>(BTreeMap<K, u64>);

impl<K: Ord> Default for Tally<K> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<K: Ord> Tally<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, count: u64) {
        *self.0.entry(key).or_insert(0) += count;
    }

    pub fn increment(&mut self, key: K) {
        self.add(key, 1);
    }

    pub fn get(&self, key: &K) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

impl<K: Ord> FromIterator<K> for Tally<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |mut tally, key| {
            tally.increment(key);
            tally
        })
    }
}

/// Workload snapshot: PRs touched in a trailing range and how many of them
/// each assignee holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentTally {
    pub prs_total: u64,
    pub assigned_prs: Tally<String>,
}

/// Counts PRs updated at or after `since`. Every distinct assignee of such a
/// PR gets exactly one increment, so a PR shared by two people counts for
/// both of them.
pub fn tally_assignments<'a>(
    pull_requests: impl IntoIterator<Item = &'a PullRequest>,
    since: DateTime<Utc>,
) -> AssignmentTally {
    pull_requests
        .into_iter()
        .filter(|pr| pr.updated_at >= since)
        .fold(AssignmentTally::default(), |mut tally, pr| {
            tally.prs_total += 1;
            let assignees: BTreeSet<&str> = pr.assignees.iter().map(String::as_str).collect();
            for login in assignees {
                tally.assigned_prs.increment(login.to_string());
            }
            tally
        })
}

/// Label counts of one pull request, as reported in the PR table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSummary {
    pub by_category: Tally<LabelCategory>,
    pub all: u64,
}

impl LabelSummary {
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a String>) -> Self {
        let distinct: BTreeSet<&str> = labels.into_iter().map(String::as_str).collect();
        Self {
            all: distinct.len() as u64,
            by_category: distinct.into_iter().map(LabelCategory::from_name).collect(),
        }
    }

    pub fn breaking(&self) -> u64 {
        self.by_category.get(&LabelCategory::Breaking)
    }

    pub fn feature(&self) -> u64 {
        self.by_category.get(&LabelCategory::Feature)
    }

    pub fn bugfix(&self) -> u64 {
        self.by_category.get(&LabelCategory::Bugfix)
    }

    pub fn maintenance(&self) -> u64 {
        self.by_category.get(&LabelCategory::Maintenance)
    }
}
