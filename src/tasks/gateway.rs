//! Remote task endpoints

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::fetch::ApiClient;
use crate::tasks::{NewTask, Task, TaskPatch, TaskResponse, TaskStatus, TasksResponse};

/// Remote task API. Mutations return the canonical record when the server
/// sends one; a 2xx acknowledgement without a readable body is `None`.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Task>>;

    async fn create(&self, task: &NewTask) -> Result<Task>;

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn set_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>>;
}

/// Create responses must carry the record, since the id is server-assigned.
/// A body without one fails to decode and is classified as malformed.
#[derive(Deserialize)]
struct Created {
    task: Task,
}

/// [`TaskApi`] over HTTP
#[derive(Clone)]
pub struct TaskGateway {
    client: ApiClient,
}

impl TaskGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskApi for TaskGateway {
    async fn list_all(&self) -> Result<Vec<Task>> {
        let response = self
            .client
            .get(&["api", "task"])?
            .execute_optional::<TasksResponse>()
            .await?;
        Ok(response.and_then(|r| r.tasks).unwrap_or_default())
    }

    async fn create(&self, task: &NewTask) -> Result<Task> {
        let created = self
            .client
            .post(&["api", "task"])?
            .json(task)?
            .execute::<Created>()
            .await?;
        Ok(created.task)
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>> {
        let response = self
            .client
            .put(&["api", "task", id])?
            .json(patch)?
            .execute_optional::<TaskResponse>()
            .await?;
        Ok(response.and_then(|r| r.task))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .delete(&["api", "task", id])?
            .execute_empty()
            .await
    }

    async fn set_status(&self, id: &str, status: TaskStatus) -> Result<Option<Task>> {
        let response = self
            .client
            .patch(&["api", "task", status.endpoint(), id])?
            .execute_optional::<TaskResponse>()
            .await?;
        Ok(response.and_then(|r| r.task))
    }
}
