pub mod open_prs;
pub mod pipeline;
pub mod scheduler;
pub mod tally;
pub mod windows;

pub use open_prs::{OpenPrRow, OpenPrTriage, DEFAULT_BOT_PATTERN};
pub use pipeline::{
    AssignmentReport, OpenPrReport, RepoActivity, ReportPipeline, WeeklyReport, WeeklySettings,
};
pub use scheduler::{FanOut, FanOutScheduler};
pub use tally::{tally_assignments, AssignmentTally, LabelSummary, Tally};
pub use windows::{bucket, weekly_windows, Activity, ActivityKind, TimeWindow, WeeklyBucket};
