use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::github::client::QueryClient;
use crate::github::queries::{Query, Variables};

/// Consecutive empty pages tolerated while the API still claims more pages.
pub const MAX_EMPTY_PAGES: u32 = 3;

/// Drives cursor pagination for a single query, handing nodes out lazily:
/// a page is only requested once every node of the previous one was consumed.
pub struct Paginator<'a> {
    client: &'a dyn QueryClient,
}

struct PageState<'a> {
    client: &'a dyn QueryClient,
    query: &'a Query,
    variables: Variables,
    /// Cursor of the last edge handed out; `None` until the first edge.
    cursor: Option<String>,
    buffer: VecDeque<Value>,
    exhausted: bool,
    empty_pages: u32,
    pages_fetched: u32,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a dyn QueryClient) -> Self {
        Self { client }
    }

    /// Lazy stream over every node of `query`. The first `Err` ends the
    /// stream; it never degrades into a short result.
    pub fn paginate<T>(&self, query: &'a Query, variables: Variables) -> BoxStream<'a, Result<T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        let state = PageState {
            client: self.client,
            query,
            variables,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
            empty_pages: 0,
            pages_fetched: 0,
        };
        stream::try_unfold(state, |state| state.next_node::<T>()).boxed()
    }

    pub async fn collect_all<T>(&self, query: &'a Query, variables: Variables) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        self.paginate(query, variables).try_collect().await
    }
}

impl<'a> PageState<'a> {
    async fn next_node<T: DeserializeOwned + Send>(mut self) -> Result<Option<(T, Self)>> {
        loop {
            if let Some(node) = self.buffer.pop_front() {
                let item = serde_json::from_value(node)
                    .map_err(|e| Error::ParseError(format!("{}: {}", self.query.name, e)))?;
                return Ok(Some((item, self)));
            }
            if self.exhausted {
                tracing::debug!(
                    query = self.query.name,
                    pages = self.pages_fetched,
                    "Pagination complete"
                );
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let cursor = self.cursor.clone().map(Value::String).unwrap_or(Value::Null);
        self.variables
            .insert(self.query.cursor_variable.to_string(), cursor);

        let page = self.client.query(self.query, &self.variables).await?;
        self.pages_fetched += 1;
        tracing::debug!(
            query = self.query.name,
            page = self.pages_fetched,
            edges = page.edges.len(),
            total = ?page.total_count,
            "Fetched page"
        );

        if page.edges.is_empty() {
            if page.page_info.has_next_page {
                // Retry from the last consumed edge rather than trusting the
                // cursor of a page that returned nothing.
                self.empty_pages += 1;
                if self.empty_pages > MAX_EMPTY_PAGES {
                    return Err(Error::Pagination(format!(
                        "{}: {} consecutive empty pages while more were reported",
                        self.query.name, self.empty_pages
                    )));
                }
                tracing::warn!(
                    query = self.query.name,
                    "Empty page reported more results, retrying from last cursor"
                );
            } else {
                self.exhausted = true;
            }
            return Ok(());
        }

        self.empty_pages = 0;
        self.exhausted = !page.page_info.has_next_page;
        for edge in page.edges {
            self.cursor = Some(edge.cursor);
            self.buffer.push_back(edge.node);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::{edges_page, ScriptedClient};
    use crate::github::queries::PULL_REQUESTS;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        number: u64,
    }

    fn vars() -> Variables {
        let mut variables = Variables::new();
        variables.insert("owner".into(), json!("org"));
        variables.insert("name".into(), json!("a"));
        variables
    }

    #[tokio::test]
    async fn test_yields_every_node_across_pages_once() {
        let client = ScriptedClient::new();
        client.push("pull requests:a", Ok(edges_page(&[1, 2], "p1", true)));
        client.push("pull requests:a", Ok(edges_page(&[3, 4], "p2", true)));
        client.push("pull requests:a", Ok(edges_page(&[5], "p3", false)));

        let items: Vec<Item> = Paginator::new(&client)
            .collect_all(&PULL_REQUESTS, vars())
            .await
            .unwrap();

        let numbers: Vec<u64> = items.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            client.cursors("pull requests:a"),
            vec![None, Some("p1-2".to_string()), Some("p2-4".to_string())]
        );
    }

    #[tokio::test]
    async fn test_next_page_is_fetched_lazily() {
        let client = ScriptedClient::new();
        client.push("pull requests:a", Ok(edges_page(&[1, 2], "p1", true)));
        client.push("pull requests:a", Ok(edges_page(&[3], "p2", false)));

        let mut stream = Paginator::new(&client).paginate::<Item>(&PULL_REQUESTS, vars());
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(client.calls(), 1);

        stream.next().await.unwrap().unwrap();
        assert_eq!(client.calls(), 1);
        stream.next().await.unwrap().unwrap();
        assert_eq!(client.calls(), 2);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_page_reuses_last_consumed_cursor() {
        let client = ScriptedClient::new();
        client.push("pull requests:a", Ok(edges_page(&[1], "p1", true)));
        client.push("pull requests:a", Ok(edges_page(&[], "p2", true)));
        client.push("pull requests:a", Ok(edges_page(&[2], "p3", false)));

        let items: Vec<Item> = Paginator::new(&client)
            .collect_all(&PULL_REQUESTS, vars())
            .await
            .unwrap();

        assert_eq!(items, vec![Item { number: 1 }, Item { number: 2 }]);
        assert_eq!(
            client.cursors("pull requests:a"),
            vec![None, Some("p1-1".to_string()), Some("p1-1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_endless_empty_pages_are_an_error() {
        let client = ScriptedClient::new();
        for _ in 0..=MAX_EMPTY_PAGES {
            client.push("pull requests:a", Ok(edges_page(&[], "e", true)));
        }

        let result: Result<Vec<Item>> = Paginator::new(&client)
            .collect_all(&PULL_REQUESTS, vars())
            .await;
        assert!(matches!(result, Err(Error::Pagination(_))));
    }

    #[tokio::test]
    async fn test_failure_mid_query_is_not_end_of_results() {
        let client = ScriptedClient::new();
        client.push("pull requests:a", Ok(edges_page(&[1, 2], "p1", true)));
        client.push(
            "pull requests:a",
            Err(Error::Unauthorized("bad credentials".into())),
        );

        let results: Vec<Result<Item>> = Paginator::new(&client)
            .paginate(&PULL_REQUESTS, vars())
            .collect()
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok() && results[1].is_ok());
        assert!(matches!(results[2], Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_undecodable_node_fails_the_query() {
        let client = ScriptedClient::new();
        let mut page = edges_page(&[1], "p1", false);
        page.edges[0].node = json!({ "number": "not a number" });
        client.push("pull requests:a", Ok(page));

        let result: Result<Vec<Item>> = Paginator::new(&client)
            .collect_all(&PULL_REQUESTS, vars())
            .await;
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[tokio::test]
    async fn test_empty_first_page_retries_from_start() {
        let client = ScriptedClient::new();
        client.push("pull requests:a", Ok(edges_page(&[], "p0", true)));
        client.push("pull requests:a", Ok(edges_page(&[1, 2], "p1", false)));

        let items: Vec<Item> = Paginator::new(&client)
            .collect_all(&PULL_REQUESTS, vars())
            .await
            .unwrap();

        assert_eq!(items, vec![Item { number: 1 }, Item { number: 2 }]);
        assert_eq!(client.cursors("pull requests:a"), vec![None, None]);
    }

    #[tokio::test]
    async fn test_every_page_size_yields_the_same_nodes() {
        let numbers: Vec<u64> = (1..=7).collect();

        for size in 1..=8 {
            let client = ScriptedClient::new();
            let chunks: Vec<&[u64]> = numbers.chunks(size).collect();
            for (i, chunk) in chunks.iter().enumerate() {
                let has_next = i + 1 < chunks.len();
                client.push("pull requests:a", Ok(edges_page(chunk, &format!("p{}", i), has_next)));
            }

            let items: Vec<Item> = Paginator::new(&client)
                .collect_all(&PULL_REQUESTS, vars())
                .await
                .unwrap();

            let seen: Vec<u64> = items.iter().map(|i| i.number).collect();
            assert_eq!(seen, numbers, "page size {}", size);
            assert_eq!(client.calls(), chunks.len(), "page size {}", size);
        }
    }
}
