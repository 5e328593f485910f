use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::date_key::DateKey;
use crate::task::{task_list, DayTaskList, Task};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("task store answered {0}")]
    Status(reqwest::StatusCode),
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(StoreError::Status(status))
    }
}

/// Raw access to the remote task store. A missing or empty `tasks` field reads
/// as an empty list.
#[async_trait]
pub trait RemoteTaskStore: Send + Sync {
    async fn get(&self, key: &DateKey) -> Result<DayTaskList, StoreError>;

    async fn put(&self, key: &DateKey, tasks: &[Task]) -> Result<(), StoreError>;

    /// Wake a host that sleeps when idle. The outcome is ignored.
    async fn warm_up(&self, _key: &DateKey) {}
}

#[derive(Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Option<DayTaskList>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest<'a> {
    user_id: &'a str,
    date: &'a DateKey,
    tasks: &'a [Task],
}

/// `GET {base}/{user}/{key}` to read, `POST {base}` to write.
pub struct HttpTaskStore {
    base_url: String,
    user_id: String,
    client: reqwest::Client,
}

impl HttpTaskStore {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
            client: reqwest::Client::new(),
        }
    }

    fn day_url(&self, key: &DateKey) -> String {
        format!("{}/{}/{}", self.base_url, self.user_id, key)
    }
}

#[async_trait]
impl RemoteTaskStore for HttpTaskStore {
    async fn get(&self, key: &DateKey) -> Result<DayTaskList, StoreError> {
        let response = self.client.get(self.day_url(key)).send().await?;
        let body: TasksResponse = check_status(response)?.json().await?;

        Ok(body.tasks.unwrap_or_default())
    }

    async fn put(&self, key: &DateKey, tasks: &[Task]) -> Result<(), StoreError> {
        let body = SaveRequest {
            user_id: &self.user_id,
            date: key,
            tasks,
        };

        let response = self.client.post(&self.base_url).json(&body).send().await?;
        check_status(response)?;

        Ok(())
    }

    async fn warm_up(&self, key: &DateKey) {
        if let Err(e) = self.client.get(self.day_url(key)).send().await {
            tracing::debug!(error = %e, "task store warm-up request failed");
        }
    }
}

/// Day-level policy over a [`RemoteTaskStore`]: seeding, defaults on failure.
#[derive(Clone)]
pub struct TaskStoreClient {
    remote: Arc<dyn RemoteTaskStore>,
    default_tasks: Arc<[String]>,
}

impl TaskStoreClient {
    pub fn new(remote: Arc<dyn RemoteTaskStore>, default_tasks: Vec<String>) -> Self {
        Self {
            remote,
            default_tasks: default_tasks.into(),
        }
    }

    fn defaults(&self) -> DayTaskList {
        task_list(&self.default_tasks)
    }

    /// Never fails. A day with no stored tasks is seeded with the defaults
    /// (the seed write completes before this returns) and the defaults are
    /// returned; an unreachable store yields the defaults without writing.
    pub async fn fetch(&self, key: &DateKey) -> DayTaskList {
        match self.remote.get(key).await {
            Ok(tasks) if !tasks.is_empty() => tasks,
            Ok(_) => {
                let defaults = self.defaults();
                if let Err(e) = self.remote.put(key, &defaults).await {
                    tracing::warn!(date = %key, error = %e, "failed to seed default tasks");
                }
                defaults
            }
            Err(e) => {
                tracing::warn!(date = %key, error = %e, "failed to fetch tasks, using defaults");
                self.defaults()
            }
        }
    }

    /// One write of the whole list. No retry; last writer wins.
    pub async fn save(&self, key: &DateKey, tasks: &[Task]) -> Result<(), StoreError> {
        self.remote.put(key, tasks).await
    }
}
