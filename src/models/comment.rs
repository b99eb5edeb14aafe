use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pull_request::AuthorAssociation;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub url: String,
    /// Number of the issue or pull request the comment was left on.
    pub number: u64,
    pub author: String,
    pub author_association: AuthorAssociation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
}
