pub mod html;
pub mod tables;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::analysis::{AssignmentTally, OpenPrReport, WeeklyReport};
use crate::error::Result;
use tables::{CommentRow, PrRow, WeeklyRow, COMMENT_COLUMNS, PR_COLUMNS, WEEKLY_COLUMNS};

pub const PR_STATS_FILE: &str = "pr_stats.csv";
pub const COMMENT_STATS_FILE: &str = "comment_stats.csv";
pub const WEEKLY_STATS_FILE: &str = "weekly_stats.csv";
pub const TOOLS_HTML_FILE: &str = "report_tools.html";
pub const TOOLS_JSON_FILE: &str = "report_tools.json";

#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub name: &'static str,
    pub contents: Vec<u8>,
}

/// A set of report files rendered in memory. Nothing touches the disk until
/// [`ReportSet::write_to`], so a rendering failure leaves no output behind.
#[derive(Debug, Clone, Default)]
pub struct ReportSet {
    files: Vec<RenderedFile>,
}

impl ReportSet {
    pub fn weekly(report: &WeeklyReport) -> Result<Self> {
        let mut pr_rows = Vec::new();
        let mut comment_rows = Vec::new();
        for (repo, activity) in &report.repositories {
            pr_rows.extend(activity.pull_requests.iter().map(|pr| PrRow::new(repo, pr)));
            comment_rows.extend(activity.comments.iter().map(|c| CommentRow::new(repo, c)));
        }
        let weekly_rows: Vec<WeeklyRow> = report.weeks.iter().map(WeeklyRow::from).collect();

        Ok(Self {
            files: vec![
                RenderedFile {
                    name: PR_STATS_FILE,
                    contents: tables::to_csv(&PR_COLUMNS, &pr_rows)?,
                },
                RenderedFile {
                    name: COMMENT_STATS_FILE,
                    contents: tables::to_csv(&COMMENT_COLUMNS, &comment_rows)?,
                },
                RenderedFile {
                    name: WEEKLY_STATS_FILE,
                    contents: tables::to_csv(&WEEKLY_COLUMNS, &weekly_rows)?,
                },
            ],
        })
    }

    pub fn open_prs(report: &OpenPrReport, generated_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            files: vec![
                RenderedFile {
                    name: TOOLS_HTML_FILE,
                    contents: html::render_open_prs(&report.rows, generated_at).into_bytes(),
                },
                RenderedFile {
                    name: TOOLS_JSON_FILE,
                    contents: serde_json::to_vec_pretty(&report.rows)?,
                },
            ],
        })
    }

    pub fn files(&self) -> &[RenderedFile] {
        &self.files
    }

    /// Write every file into `dir`. All files are first written to temporary
    /// names; they are renamed into place only once every write succeeded.
    /// A failed rename removes whatever is still staged.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let tmp = dir.join(format!(".{}.tmp", file.name));
            if let Err(e) = fs::write(&tmp, &file.contents) {
                let _ = fs::remove_file(&tmp);
                for (tmp, _) in &staged {
                    let _ = fs::remove_file(tmp);
                }
                return Err(e.into());
            }
            staged.push((tmp, dir.join(file.name)));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (tmp, target)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, target) {
                for (tmp, _) in &staged[i..] {
                    let _ = fs::remove_file(tmp);
                }
                return Err(e.into());
            }
            tracing::info!("Wrote {}", target.display());
            written.push(target.clone());
        }
        Ok(written)
    }
}

/// The workload snapshot as printed on stdout.
pub fn assignment_json(tally: &AssignmentTally) -> Result<String> {
    Ok(serde_json::to_string_pretty(tally)?)
}
