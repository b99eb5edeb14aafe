//! Node shapes as they come back from the GraphQL API, and their
//! conversion into the domain models.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{AuthorAssociation, Comment, PullRequest, RepoKind, Repository};

/// Login shown for content whose author account was deleted.
const GHOST_LOGIN: &str = "ghost";

#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Nodes<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Count {
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelNode {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRepositoryNode {
    pub name: String,
    pub owner: Actor,
}

impl TeamRepositoryNode {
    pub fn into_repository(self, kind: RepoKind) -> Repository {
        Repository::new(self.owner.login, self.name, kind)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: Option<Actor>,
    #[serde(default)]
    pub author_association: AuthorAssociation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Option<Nodes<LabelNode>>,
    #[serde(default)]
    pub assignees: Option<Nodes<Actor>>,
    #[serde(default)]
    pub comments: Option<Count>,
}

impl From<PullRequestNode> for PullRequest {
    fn from(node: PullRequestNode) -> Self {
        // A merge closes the PR; keep closed_at populated for merged PRs.
        let closed_at = node.closed_at.or(node.merged_at);
        Self {
            id: node.id,
            number: node.number,
            title: node.title,
            url: node.url,
            author: node.author.map(|a| a.login).unwrap_or_else(|| GHOST_LOGIN.to_string()),
            author_association: node.author_association,
            created_at: node.created_at,
            updated_at: node.updated_at,
            closed_at,
            merged_at: node.merged_at,
            labels: node
                .labels
                .unwrap_or_default()
                .nodes
                .into_iter()
                .map(|l| l.name)
                .collect(),
            assignees: node
                .assignees
                .unwrap_or_default()
                .nodes
                .into_iter()
                .map(|a| a.login)
                .collect(),
            comment_count: node.comments.unwrap_or_default().total_count,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: String,
    pub url: String,
    pub author: Option<Actor>,
    #[serde(default)]
    pub author_association: AuthorAssociation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub body: Option<String>,
}

impl CommentNode {
    pub fn into_comment(self, number: u64) -> Comment {
        Comment {
            id: self.id,
            url: self.url,
            number,
            author: self.author.map(|a| a.login).unwrap_or_else(|| GHOST_LOGIN.to_string()),
            author_association: self.author_association,
            created_at: self.created_at,
            updated_at: self.updated_at,
            body: self.body.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentConnection {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub nodes: Vec<CommentNode>,
}

/// An issue together with its most recent comments.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueNode {
    pub number: u64,
    #[serde(default)]
    pub comments: CommentConnection,
}

impl IssueNode {
    /// True when the inline comments do not cover the whole thread.
    pub fn is_truncated(&self) -> bool {
        self.comments.total_count > self.comments.nodes.len() as u64
    }

    pub fn into_comments(self) -> Vec<Comment> {
        let number = self.number;
        self.comments
            .nodes
            .into_iter()
            .map(|node| node.into_comment(number))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pull_request_node_conversion() {
        let node: PullRequestNode = serde_json::from_value(json!({
            "id": "PR_1",
            "number": 12,
            "title": "Add feature",
            "url": "https://github.com/org/a/pull/12",
            "author": null,
            "authorAssociation": "MEMBER",
            "createdAt": "2020-05-01T10:00:00Z",
            "updatedAt": "2020-05-03T10:00:00Z",
            "closedAt": null,
            "mergedAt": "2020-05-03T10:00:00Z",
            "labels": { "nodes": [{ "name": "feature" }, { "name": "feature" }, { "name": "bugfix" }] },
            "assignees": { "nodes": [{ "login": "alice" }] },
            "comments": { "totalCount": 4 }
        }))
        .unwrap();

        let pr = PullRequest::from(node);
        assert_eq!(pr.author, "ghost");
        assert_eq!(pr.author_association, AuthorAssociation::Member);
        assert_eq!(pr.closed_at, pr.merged_at);
        assert_eq!(pr.labels.len(), 2);
        assert_eq!(pr.assignees, vec!["alice".to_string()]);
        assert_eq!(pr.comment_count, 4);
    }

    #[test]
    fn test_comment_without_body_is_empty() {
        let node: CommentNode = serde_json::from_value(json!({
            "id": "IC_1",
            "url": "https://github.com/org/a/pull/12#issuecomment-1",
            "author": { "login": "bob" },
            "authorAssociation": "NONE",
            "createdAt": "2020-05-01T10:00:00Z",
            "updatedAt": "2020-05-01T10:00:00Z",
            "body": null
        }))
        .unwrap();

        let comment = node.into_comment(12);
        assert_eq!(comment.body, "");
        assert_eq!(comment.number, 12);
        assert_eq!(comment.author, "bob");
    }
}
