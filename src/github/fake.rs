//! In-memory `QueryClient` that replays scripted pages, for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::github::client::QueryClient;
use crate::github::queries::{Edge, Page, PageInfo, Query, Variables};

/// Responses are keyed by `"<query name>:<repository name>"`, with
/// `":<number>"` appended for per-PR queries, and replayed in push order.
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<HashMap<String, VecDeque<Result<Page>>>>,
    log: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, key: &str, response: Result<Page>) {
        self.responses
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    /// Cursors sent for `key`, in call order.
    pub fn cursors(&self, key: &str) -> Vec<Option<String>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, cursor)| cursor.clone())
            .collect()
    }

    fn key(query: &Query, variables: &Variables) -> String {
        let scope = variables
            .get("name")
            .or_else(|| variables.get("teamSlug"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        match variables.get("number").and_then(Value::as_u64) {
            Some(number) => format!("{}:{}:{}", query.name, scope, number),
            None => format!("{}:{}", query.name, scope),
        }
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    async fn query(&self, query: &Query, variables: &Variables) -> Result<Page> {
        let key = Self::key(query, variables);
        let cursor = variables
            .get(query.cursor_variable)
            .and_then(Value::as_str)
            .map(str::to_string);
        self.log.lock().unwrap().push((key.clone(), cursor));

        self.responses
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(Error::GitHubApi(format!("no scripted response for {}", key))))
    }
}

/// A page of `{ "number": n }` nodes whose edge cursors are `"<prefix>-<n>"`.
pub fn edges_page(numbers: &[u64], prefix: &str, has_next_page: bool) -> Page {
    let edges = numbers
        .iter()
        .map(|n| Edge {
            node: json!({ "number": n }),
            cursor: format!("{}-{}", prefix, n),
        })
        .collect();
    build_page(edges, has_next_page)
}

/// A page of arbitrary nodes whose edge cursors are `"<prefix>-<index>"`.
pub fn nodes_page(nodes: Vec<Value>, prefix: &str, has_next_page: bool) -> Page {
    let edges = nodes
        .into_iter()
        .enumerate()
        .map(|(i, node)| Edge {
            node,
            cursor: format!("{}-{}", prefix, i),
        })
        .collect();
    build_page(edges, has_next_page)
}

fn build_page(edges: Vec<Edge>, has_next_page: bool) -> Page {
    let end_cursor = edges.last().map(|e: &Edge| e.cursor.clone());
    Page {
        total_count: None,
        edges,
        page_info: PageInfo {
            end_cursor,
            has_next_page,
        },
    }
}

/// A pull request node as returned by `PULL_REQUESTS`, open and unlabelled.
/// Tests set `closedAt`, `mergedAt`, labels or assignees on the value.
pub fn pr_node(number: u64, updated_at: &str, comments: u64) -> Value {
    json!({
        "id": format!("PR_{}", number),
        "number": number,
        "title": format!("Change {}", number),
        "url": format!("https://github.com/org/a/pull/{}", number),
        "author": { "login": "octocat" },
        "authorAssociation": "CONTRIBUTOR",
        "createdAt": "2020-05-01T00:00:00Z",
        "updatedAt": updated_at,
        "closedAt": null,
        "mergedAt": null,
        "labels": { "nodes": [] },
        "assignees": { "nodes": [] },
        "comments": { "totalCount": comments }
    })
}

pub fn comment_node(id: &str, author: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "url": format!("https://github.com/org/a/pull/1#{}", id),
        "author": { "login": author },
        "authorAssociation": "MEMBER",
        "createdAt": created_at,
        "updatedAt": created_at,
        "body": "<p>looks good</p>"
    })
}

/// An issue node as returned by `ISSUE_COMMENTS`. `total` may exceed the
/// number of inline comments to mark the thread as truncated.
pub fn issue_node(number: u64, comments: Vec<Value>, total: u64) -> Value {
    json!({
        "number": number,
        "comments": { "totalCount": total, "nodes": comments }
    })
}
