//! RestStore: tasks and columns in a hosted PostgREST-style table API.
//!
//! Endpoints: `{base}/rest/v1/columns` and `{base}/rest/v1/tasks`, filtered
//! with `col=eq.value` query params. Every request carries the project API key
//! and a bearer token (the signed-in user's access token when present, the
//! API key otherwise). Each call is retried per [`RetryPolicy`].

use async_trait::async_trait;
use backon::Retryable;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tometo_core::{Column, NewTask, Task, TaskPatch};

use crate::error::StoreError;
use crate::retry::RetryPolicy;
use crate::store::TaskStore;

const COLUMNS_TABLE: &str = "columns";
const TASKS_TABLE: &str = "tasks";

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RestStore {
    pub fn new(config: RestConfig) -> Result<Self, StoreError> {
        if config.base_url.trim().is_empty() {
            return Err(StoreError::NotConfigured("backend url is empty".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(StoreError::NotConfigured("api key is empty".to_string()));
        }

        let bearer = config.access_token.as_deref().unwrap_or(&config.api_key);
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&config.api_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {bearer}"))?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        call.retry(self.retry.backoff())
            .when(|e: &StoreError| e.should_retry())
            .notify(|err: &StoreError, dur: Duration| {
                tracing::warn!(
                    "{} failed, retrying after {:.2}s: {}",
                    op,
                    dur.as_secs_f64(),
                    err
                );
            })
            .await
    }

    /// Send, map error statuses, decode the JSON body.
    async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, StoreError> {
        let resp = check(request.send().await?).await?;
        Ok(resp.json().await?)
    }

    /// Run a `return=representation` write and take the single affected row.
    async fn fetch_one(id: &str, request: RequestBuilder) -> Result<Task, StoreError> {
        let rows: Vec<Task> = Self::fetch(request.header("Prefer", "return=representation")).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))
    }
}

fn header_value(s: &str) -> Result<HeaderValue, StoreError> {
    HeaderValue::from_str(s)
        .map_err(|e| StoreError::NotConfigured(format!("invalid header value: {e}")))
}

async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(StoreError::RateLimited);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

/// PostgREST `in.(a,b)` filter; values are quoted so ids may hold commas.
fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl TaskStore for RestStore {
    async fn list_columns(&self, board_id: &str) -> Result<Vec<Column>, StoreError> {
        let url = self.table_url(COLUMNS_TABLE);
        self.with_retry("list columns", || {
            let req = self.client.get(&url).query(&[
                ("select", "*".to_string()),
                ("board_id", format!("eq.{board_id}")),
                ("order", "position.asc".to_string()),
            ]);
            Self::fetch(req)
        })
        .await
    }

    async fn list_tasks(&self, column_ids: &[String]) -> Result<Vec<Task>, StoreError> {
        if column_ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.table_url(TASKS_TABLE);
        let filter = in_filter(column_ids);
        self.with_retry("list tasks", || {
            let req = self.client.get(&url).query(&[
                ("select", "*".to_string()),
                ("column_id", filter.clone()),
            ]);
            Self::fetch(req)
        })
        .await
    }

    async fn insert_task(&self, task: &NewTask) -> Result<Task, StoreError> {
        let url = self.table_url(TASKS_TABLE);
        let body = [task];
        self.with_retry("insert task", || {
            let req = self.client.post(&url).json(&body);
            Self::fetch_one("<new>", req)
        })
        .await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        let url = self.table_url(TASKS_TABLE);
        self.with_retry("update task", || {
            let req = self
                .client
                .patch(&url)
                .query(&[("id", format!("eq.{id}"))])
                .json(patch);
            Self::fetch_one(id, req)
        })
        .await
    }

    async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        let url = self.table_url(TASKS_TABLE);
        let rows: Vec<Task> = self
            .with_retry("delete task", || {
                let req = self
                    .client
                    .delete(&url)
                    .query(&[("id", format!("eq.{id}"))])
                    .header("Prefer", "return=representation");
                Self::fetch(req)
            })
            .await?;
        if rows.is_empty() {
            return Err(StoreError::TaskNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_filter_quotes_values() {
        let ids = vec!["a".to_string(), "b,c".to_string()];
        assert_eq!(in_filter(&ids), r#"in.("a","b,c")"#);
    }

    #[test]
    fn test_requires_url_and_key() {
        assert!(matches!(
            RestStore::new(RestConfig::new("", "key")),
            Err(StoreError::NotConfigured(_))
        ));
        assert!(matches!(
            RestStore::new(RestConfig::new("http://localhost", " ")),
            Err(StoreError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_trims_trailing_slash() {
        let store = RestStore::new(RestConfig::new("http://localhost:54321/", "key")).unwrap();
        assert_eq!(store.table_url("tasks"), "http://localhost:54321/rest/v1/tasks");
    }
}
