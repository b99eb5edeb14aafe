use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

pub type Variables = serde_json::Map<String, Value>;

/// A paginated GraphQL query: the document, the name of the variable that
/// carries the page cursor and the path from `data` to the connection.
#[derive(Debug, Clone, Copy)]
pub struct Query {
    pub name: &'static str,
    pub document: &'static str,
    pub cursor_variable: &'static str,
    pub connection_path: &'static [&'static str],
}

/// One page of a GraphQL connection, with nodes left untyped until the
/// paginator hands them out.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge {
    pub node: Value,
    pub cursor: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl Query {
    /// Walk `connection_path` inside a response's `data` and decode the page.
    pub fn extract_page(&self, data: Value) -> Result<Page> {
        let mut current = data;
        for key in self.connection_path {
            current = match current {
                Value::Object(mut map) => map.remove(*key).unwrap_or(Value::Null),
                _ => Value::Null,
            };
            if current.is_null() {
                return Err(Error::RepoNotFound(format!(
                    "{}: no `{}` in response",
                    self.name, key
                )));
            }
        }
        serde_json::from_value(current)
            .map_err(|e| Error::ParseError(format!("{}: {}", self.name, e)))
    }
}

pub const TEAM_REPOSITORIES: Query = Query {
    name: "team repositories",
    document: r#"
query ($organization: String!, $teamSlug: String!, $pageSize: Int = 100, $cursor: String) {
  organization(login: $organization) {
    team(slug: $teamSlug) {
      repositories(first: $pageSize, after: $cursor, orderBy: {field: NAME, direction: ASC}) {
        totalCount
        edges {
          node {
            name
            owner { login }
          }
          cursor
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#,
    cursor_variable: "cursor",
    connection_path: &["organization", "team", "repositories"],
};

pub const PULL_REQUESTS: Query = Query {
    name: "pull requests",
    document: r#"
query ($owner: String!, $name: String!, $states: [PullRequestState!], $pageSize: Int = 100, $cursor: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(first: $pageSize, after: $cursor, states: $states, orderBy: {field: UPDATED_AT, direction: DESC}) {
      totalCount
      edges {
        node {
          id
          number
          title
          url
          author { login }
          authorAssociation
          createdAt
          updatedAt
          closedAt
          mergedAt
          labels(first: 50) { nodes { name } }
          assignees(first: 20) { nodes { login } }
          comments { totalCount }
        }
        cursor
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#,
    cursor_variable: "cursor",
    connection_path: &["repository", "pullRequests"],
};

pub const PULL_REQUEST_COMMENTS: Query = Query {
    name: "pull request comments",
    document: r#"
query ($owner: String!, $name: String!, $number: Int!, $pageSize: Int = 100, $cursor: String) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      comments(first: $pageSize, after: $cursor) {
        totalCount
        edges {
          node {
            id
            url
            author { login }
            authorAssociation
            createdAt
            updatedAt
            body
          }
          cursor
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#,
    cursor_variable: "cursor",
    connection_path: &["repository", "pullRequest", "comments"],
};

/// Issues updated at or after `$since`, each with its latest 100 comments.
/// Pull requests are not issues here; their comments come from
/// `PULL_REQUEST_COMMENTS`.
pub const ISSUE_COMMENTS: Query = Query {
    name: "issue comments",
    document: r#"
query ($owner: String!, $name: String!, $since: DateTime!, $pageSize: Int = 50, $cursor: String) {
  repository(owner: $owner, name: $name) {
    issues(first: $pageSize, after: $cursor, filterBy: {since: $since}, orderBy: {field: UPDATED_AT, direction: DESC}) {
      totalCount
      edges {
        node {
          number
          comments(last: 100) {
            totalCount
            nodes {
              id
              url
              author { login }
              authorAssociation
              createdAt
              updatedAt
              body
            }
          }
        }
        cursor
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#,
    cursor_variable: "cursor",
    connection_path: &["repository", "issues"],
};

/// Every comment of one issue, for threads too long to inline.
pub const ISSUE_COMMENT_THREAD: Query = Query {
    name: "issue comment thread",
    document: r#"
query ($owner: String!, $name: String!, $number: Int!, $pageSize: Int = 100, $cursor: String) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      comments(first: $pageSize, after: $cursor) {
        totalCount
        edges {
          node {
            id
            url
            author { login }
            authorAssociation
            createdAt
            updatedAt
            body
          }
          cursor
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#,
    cursor_variable: "cursor",
    connection_path: &["repository", "issue", "comments"],
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_page_follows_path() {
        let data = json!({
            "repository": {
                "pullRequests": {
                    "totalCount": 1,
                    "edges": [{ "node": { "number": 7 }, "cursor": "c1" }],
                    "pageInfo": { "endCursor": "c1", "hasNextPage": false }
                }
            }
        });
        let page = PULL_REQUESTS.extract_page(data).unwrap();
        assert_eq!(page.total_count, Some(1));
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].cursor, "c1");
        assert!(!page.page_info.has_next_page);
    }

    #[test]
    fn test_extract_page_missing_repository() {
        let data = json!({ "repository": null });
        let err = PULL_REQUESTS.extract_page(data).unwrap_err();
        assert!(matches!(err, Error::RepoNotFound(_)));
    }

    #[test]
    fn test_extract_page_malformed_connection() {
        let data = json!({ "repository": { "pullRequests": { "edges": [] } } });
        let err = PULL_REQUESTS.extract_page(data).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }
}
