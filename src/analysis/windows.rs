//! Weekly bucketing of PR and comment activity.
//!
//! Window edges are strict on both sides: a record stamped exactly on an
//! edge belongs to neither adjacent window. Historical reports were produced
//! with this rule, so it is kept even though such records drop out entirely.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::Serialize;

use crate::analysis::tally::Tally;
use crate::models::{Comment, PullRequest};

pub const WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start < timestamp && timestamp < self.end
    }

    /// Calendar date of the right edge, used to label the week.
    pub fn ending_on(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Closed,
    Merged,
    Commented,
}

/// `reference` itself when it falls on `anchor`, otherwise the next `anchor`
/// after it.
pub fn next_anchor_day(reference: NaiveDate, anchor: Weekday) -> NaiveDate {
    let days_ahead = (anchor.num_days_from_monday() + 7
        - reference.weekday().num_days_from_monday())
        % 7;
    reference + Duration::days(days_ahead as i64)
}

/// `count` consecutive 7-day windows, oldest first. The most recent window
/// ends at midnight UTC of the anchor day found from `reference`.
pub fn weekly_windows(reference: NaiveDate, anchor: Weekday, count: usize) -> Vec<TimeWindow> {
    let last_end = Utc.from_utc_datetime(&next_anchor_day(reference, anchor).and_time(NaiveTime::MIN));

    let mut windows: Vec<TimeWindow> = (0..count as i64)
        .map(|i| {
            let end = last_end - Duration::days(WINDOW_DAYS * i);
            TimeWindow {
                start: end - Duration::days(WINDOW_DAYS),
                end,
            }
        })
        .collect();
    windows.reverse();
    windows
}

/// Timestamps of the three activity kinds, split up front so a merged PR can
/// never also be counted as closed. Each list is sorted.
#[derive(Debug, Clone, Default)]
pub struct Activity {
    closed: Vec<DateTime<Utc>>,
    merged: Vec<DateTime<Utc>>,
    commented: Vec<DateTime<Utc>>,
}

impl Activity {
    pub fn from_records<'a>(
        pull_requests: impl IntoIterator<Item = &'a PullRequest>,
        comments: impl IntoIterator<Item = &'a Comment>,
    ) -> Self {
        let pull_requests: Vec<&PullRequest> = pull_requests.into_iter().collect();

        let merged = pull_requests
            .iter()
            .filter(|pr| pr.is_merged())
            .filter_map(|pr| pr.resolved_at())
            .collect();
        let closed = pull_requests
            .iter()
            .filter(|pr| pr.is_closed_unmerged())
            .filter_map(|pr| pr.closed_at)
            .collect();
        let commented = comments.into_iter().map(|c| c.created_at).collect();

        Self::from_timestamps(closed, merged, commented)
    }

    pub fn from_timestamps(
        mut closed: Vec<DateTime<Utc>>,
        mut merged: Vec<DateTime<Utc>>,
        mut commented: Vec<DateTime<Utc>>,
    ) -> Self {
        closed.sort_unstable();
        merged.sort_unstable();
        commented.sort_unstable();
        Self {
            closed,
            merged,
            commented,
        }
    }

    fn timestamps(&self, kind: ActivityKind) -> &[DateTime<Utc>] {
        match kind {
            ActivityKind::Closed => &self.closed,
            ActivityKind::Merged => &self.merged,
            ActivityKind::Commented => &self.commented,
        }
    }
}

/// Number of sorted timestamps strictly inside `window`.
fn count_within(sorted: &[DateTime<Utc>], window: &TimeWindow) -> u64 {
    let after_start = sorted.partition_point(|t| *t <= window.start);
    let before_end = sorted.partition_point(|t| *t < window.end);
    before_end.saturating_sub(after_start) as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyBucket {
    pub window: TimeWindow,
    pub counts: Tally<ActivityKind>,
}

impl WeeklyBucket {
    pub fn count(&self, kind: ActivityKind) -> u64 {
        self.counts.get(&kind)
    }
}

/// One bucket per window, in the order the windows are given.
pub fn bucket(activity: &Activity, windows: &[TimeWindow]) -> Vec<WeeklyBucket> {
    const KINDS: [ActivityKind; 3] = [
        ActivityKind::Closed,
        ActivityKind::Merged,
        ActivityKind::Commented,
    ];

    windows
        .iter()
        .map(|window| {
            let counts = KINDS.iter().fold(Tally::new(), |mut counts, kind| {
                counts.add(*kind, count_within(activity.timestamps(*kind), window));
                counts
            });
            WeeklyBucket {
                window: *window,
                counts,
            }
        })
        .collect()
}
