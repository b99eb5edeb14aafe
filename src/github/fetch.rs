//! Fetches a repository's records by driving the paginator over the
//! GraphQL queries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{future, TryStreamExt};
use serde_json::json;

use crate::error::Result;
use crate::github::client::QueryClient;
use crate::github::nodes::{CommentNode, IssueNode, PullRequestNode, TeamRepositoryNode};
use crate::github::paginator::Paginator;
use crate::github::queries::{
    Query, Variables, ISSUE_COMMENTS, ISSUE_COMMENT_THREAD, PULL_REQUESTS, PULL_REQUEST_COMMENTS,
    TEAM_REPOSITORIES,
};
use crate::models::{Comment, PullRequest, RepoKind, Repository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrFilter {
    All,
    Open,
}

fn repository_variables(repo: &Repository) -> Variables {
    let mut variables = Variables::new();
    variables.insert("owner".into(), json!(repo.namespace));
    variables.insert("name".into(), json!(repo.name));
    variables
}

pub async fn team_repositories(
    client: &dyn QueryClient,
    organization: &str,
    team: &str,
    kind: RepoKind,
) -> Result<Vec<Repository>> {
    let mut variables = Variables::new();
    variables.insert("organization".into(), json!(organization));
    variables.insert("teamSlug".into(), json!(team));

    tracing::info!("Fetching repositories of team {}/{}", organization, team);
    let nodes: Vec<TeamRepositoryNode> = Paginator::new(client)
        .collect_all(&TEAM_REPOSITORIES, variables)
        .await?;
    Ok(nodes.into_iter().map(|n| n.into_repository(kind)).collect())
}

/// Pull requests of `repo`, most recently updated first.
pub async fn pull_requests(
    client: &dyn QueryClient,
    repo: &Repository,
    filter: PrFilter,
) -> Result<Vec<PullRequest>> {
    let mut variables = repository_variables(repo);
    if filter == PrFilter::Open {
        variables.insert("states".into(), json!(["OPEN"]));
    }

    tracing::debug!("Fetching pull requests for: {}", repo);
    Paginator::new(client)
        .paginate::<PullRequestNode>(&PULL_REQUESTS, variables)
        .map_ok(PullRequest::from)
        .try_collect()
        .await
}

/// Pull requests updated at or after `since`. Results come back ordered by
/// update time, so pagination stops at the first older one.
pub async fn pull_requests_updated_since(
    client: &dyn QueryClient,
    repo: &Repository,
    since: DateTime<Utc>,
) -> Result<Vec<PullRequest>> {
    tracing::debug!("Fetching pull requests for {} updated since {}", repo, since);
    Paginator::new(client)
        .paginate::<PullRequestNode>(&PULL_REQUESTS, repository_variables(repo))
        .map_ok(PullRequest::from)
        .try_take_while(move |pr| future::ready(Ok(pr.updated_at >= since)))
        .try_collect()
        .await
}

async fn comment_thread(
    client: &dyn QueryClient,
    query: &'static Query,
    repo: &Repository,
    number: u64,
) -> Result<Vec<Comment>> {
    let mut variables = repository_variables(repo);
    variables.insert("number".into(), json!(number));

    Paginator::new(client)
        .paginate::<CommentNode>(query, variables)
        .map_ok(|node| node.into_comment(number))
        .try_collect()
        .await
}

pub async fn pull_request_comments(
    client: &dyn QueryClient,
    repo: &Repository,
    number: u64,
) -> Result<Vec<Comment>> {
    comment_thread(client, &PULL_REQUEST_COMMENTS, repo, number).await
}

/// Comments updated at or after `since` on the repository's issues. One
/// paginated query covers every issue touched since then; only threads
/// longer than the inline page get a request of their own.
pub async fn issue_comments_since(
    client: &dyn QueryClient,
    repo: &Repository,
    since: DateTime<Utc>,
) -> Result<Vec<Comment>> {
    let mut variables = repository_variables(repo);
    variables.insert("since".into(), json!(since.to_rfc3339()));

    let issues: Vec<IssueNode> = Paginator::new(client)
        .collect_all(&ISSUE_COMMENTS, variables)
        .await?;

    let mut comments = Vec::new();
    for issue in issues {
        let thread = if issue.is_truncated() {
            tracing::debug!("{}: issue #{} has a long thread, fetching all of it", repo, issue.number);
            comment_thread(client, &ISSUE_COMMENT_THREAD, repo, issue.number).await?
        } else {
            issue.into_comments()
        };
        comments.extend(thread.into_iter().filter(|c| c.updated_at >= since));
    }

    tracing::debug!("{}: {} issue comments since {}", repo, comments.len(), since);
    Ok(comments)
}

/// Comments updated at or after `since` on any of `pull_requests`.
///
/// Per-PR requests run one after another with `pause` in between to stay
/// under the API's request rate. PRs that were not updated since `since`, or
/// that have no comments, are skipped without a request.
pub async fn comments_since(
    client: &dyn QueryClient,
    repo: &Repository,
    pull_requests: &[PullRequest],
    since: DateTime<Utc>,
    pause: Duration,
) -> Result<Vec<Comment>> {
    let mut comments = Vec::new();
    let candidates = pull_requests
        .iter()
        .filter(|pr| pr.updated_at >= since && pr.comment_count > 0);

    for (i, pr) in candidates.enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        let fetched = pull_request_comments(client, repo, pr.number).await?;
        comments.extend(fetched.into_iter().filter(|c| c.updated_at >= since));
    }

    tracing::debug!("{}: {} comments since {}", repo, comments.len(), since);
    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::github::fake::{comment_node, issue_node, nodes_page, pr_node, ScriptedClient};

    fn repo() -> Repository {
        Repository::new("org", "a", RepoKind::Module)
    }

    #[tokio::test]
    async fn test_updated_since_stops_at_older_pull_request() {
        let client = ScriptedClient::new();
        client.push(
            "pull requests:a",
            Ok(nodes_page(
                vec![
                    pr_node(3, "2020-05-30T00:00:00Z", 0),
                    pr_node(2, "2020-05-28T00:00:00Z", 0),
                ],
                "p1",
                true,
            )),
        );
        client.push(
            "pull requests:a",
            Ok(nodes_page(
                vec![
                    pr_node(1, "2020-05-01T00:00:00Z", 0),
                    pr_node(0, "2020-04-01T00:00:00Z", 0),
                ],
                "p2",
                true,
            )),
        );

        let since = "2020-05-24T00:00:00Z".parse().unwrap();
        let prs = pull_requests_updated_since(&client, &repo(), since).await.unwrap();

        assert_eq!(prs.iter().map(|p| p.number).collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_comments_since_skips_quiet_pull_requests_and_pauses() {
        let client = ScriptedClient::new();
        client.push(
            "pull request comments:a:1",
            Ok(nodes_page(
                vec![
                    comment_node("c1", "reviewer", "2020-05-25T00:00:00Z"),
                    comment_node("c0", "reviewer", "2020-01-01T00:00:00Z"),
                ],
                "c",
                false,
            )),
        );
        client.push(
            "pull request comments:a:3",
            Ok(nodes_page(vec![comment_node("c3", "reviewer", "2020-05-26T00:00:00Z")], "c", false)),
        );

        let prs: Vec<PullRequest> = [
            pr_node(1, "2020-05-25T00:00:00Z", 2),
            pr_node(2, "2020-05-25T00:00:00Z", 0),
            pr_node(3, "2020-05-26T00:00:00Z", 1),
            pr_node(4, "2020-01-01T00:00:00Z", 5),
        ]
        .into_iter()
        .map(|v| PullRequest::from(serde_json::from_value::<PullRequestNode>(v).unwrap()))
        .collect();

        let started = tokio::time::Instant::now();
        let since = "2020-05-24T00:00:00Z".parse().unwrap();
        let comments = comments_since(&client, &repo(), &prs, since, Duration::from_secs(2))
            .await
            .unwrap();

        let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert_eq!(comments[1].number, 3);
        assert_eq!(client.calls(), 2);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_comment_failure_fails_the_repository() {
        let client = ScriptedClient::new();
        client.push("pull request comments:a:1", Err(Error::RateLimited(30)));

        let prs = vec![PullRequest::from(
            serde_json::from_value::<PullRequestNode>(pr_node(1, "2020-05-25T00:00:00Z", 1))
                .unwrap(),
        )];
        let since = "2020-05-24T00:00:00Z".parse().unwrap();
        let result = comments_since(&client, &repo(), &prs, since, Duration::ZERO).await;
        assert!(matches!(result, Err(Error::RateLimited(30))));
    }

    #[tokio::test]
    async fn test_issue_comments_since_one_query_per_repository() {
        let client = ScriptedClient::new();
        client.push(
            "issue comments:a",
            Ok(nodes_page(
                vec![
                    issue_node(
                        40,
                        vec![
                            comment_node("ic-old", "alice", "2020-05-01T00:00:00Z"),
                            comment_node("ic-new", "alice", "2020-05-25T00:00:00Z"),
                        ],
                        2,
                    ),
                    issue_node(41, vec![], 0),
                ],
                "i",
                false,
            )),
        );

        let since = "2020-05-24T00:00:00Z".parse().unwrap();
        let comments = issue_comments_since(&client, &repo(), since).await.unwrap();

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, "ic-new");
        assert_eq!(comments[0].number, 40);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_long_issue_thread_is_fetched_in_full() {
        let client = ScriptedClient::new();
        client.push(
            "issue comments:a",
            Ok(nodes_page(
                vec![issue_node(7, vec![comment_node("ic-3", "bob", "2020-05-27T00:00:00Z")], 3)],
                "i",
                false,
            )),
        );
        client.push(
            "issue comment thread:a:7",
            Ok(nodes_page(
                vec![
                    comment_node("ic-1", "bob", "2020-05-25T00:00:00Z"),
                    comment_node("ic-2", "bob", "2020-05-26T00:00:00Z"),
                ],
                "t1",
                true,
            )),
        );
        client.push(
            "issue comment thread:a:7",
            Ok(nodes_page(vec![comment_node("ic-3", "bob", "2020-05-27T00:00:00Z")], "t2", false)),
        );

        let since = "2020-05-24T00:00:00Z".parse().unwrap();
        let comments = issue_comments_since(&client, &repo(), since).await.unwrap();

        let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ic-1", "ic-2", "ic-3"]);
        assert!(comments.iter().all(|c| c.number == 7));
    }

    #[tokio::test]
    async fn test_team_repositories_use_owner_login() {
        let client = ScriptedClient::new();
        client.push(
            "team repositories:modules",
            Ok(nodes_page(
                vec![json!({ "name": "puppetlabs-apache", "owner": { "login": "puppetlabs" } })],
                "t",
                false,
            )),
        );

        let repos = team_repositories(&client, "puppetlabs", "modules", RepoKind::Module)
            .await
            .unwrap();
        assert_eq!(repos, vec![Repository::new("puppetlabs", "puppetlabs-apache", RepoKind::Module)]);
    }
}
