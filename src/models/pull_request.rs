use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Role of an author relative to the repository's owning organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorAssociation {
    Owner,
    Member,
    Collaborator,
    Contributor,
    FirstTimeContributor,
    FirstTimer,
    Mannequin,
    #[default]
    None,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for AuthorAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            AuthorAssociation::Owner => "OWNER",
            AuthorAssociation::Member => "MEMBER",
            AuthorAssociation::Collaborator => "COLLABORATOR",
            AuthorAssociation::Contributor => "CONTRIBUTOR",
            AuthorAssociation::FirstTimeContributor => "FIRST_TIME_CONTRIBUTOR",
            AuthorAssociation::FirstTimer => "FIRST_TIMER",
            AuthorAssociation::Mannequin => "MANNEQUIN",
            AuthorAssociation::None => "NONE",
            AuthorAssociation::Unknown => "UNKNOWN",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub author_association: AuthorAssociation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub labels: IndexSet<String>,
    pub assignees: Vec<String>,
    pub comment_count: u64,
}

impl PullRequest {
    /// Merged is a refinement of closed: a merge timestamp wins over a
    /// closing timestamp.
    pub fn state(&self) -> PrState {
        if self.merged_at.is_some() {
            PrState::Merged
        } else if self.closed_at.is_some() {
            PrState::Closed
        } else {
            PrState::Open
        }
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// Closed without being merged.
    pub fn is_closed_unmerged(&self) -> bool {
        self.closed_at.is_some() && self.merged_at.is_none()
    }

    /// The instant the PR left the open state, if it has.
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at.or(self.merged_at)
    }
}
