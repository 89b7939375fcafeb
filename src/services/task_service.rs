//! Task Service
//!
//! Background tasks run by the server: creation, start, cancellation and
//! log retrieval.

use super::require;
use crate::api::types::{NewTask, RecordId, Task, TaskLogs};
use crate::api::{ApiClient, RequestOptions, Resource};
use crate::display::TaskFilter;
use crate::error::Result;
use tracing::info;

pub struct TaskService;

impl TaskService {
    pub async fn list(client: &ApiClient) -> Result<Vec<Task>> {
        client.get_json(Resource::Tasks, &Resource::Tasks.route()).await
    }

    pub async fn count(client: &ApiClient) -> Result<u64> {
        client.count(Resource::Tasks).await
    }

    pub async fn get(client: &ApiClient, id: &RecordId) -> Result<Task> {
        client
            .get_json(Resource::Tasks, &Resource::Tasks.item(id))
            .await
    }

    /// Create a task; the server queues it as pending
    pub async fn create(client: &ApiClient, task: &NewTask) -> Result<Task> {
        require(&task.name, "Name")?;
        require(&task.command, "Command")?;

        info!("Creating task {} ({})", task.name, task.command);
        client
            .post_json(Resource::Tasks, &Resource::Tasks.route(), task)
            .await
    }

    pub async fn start(client: &ApiClient, id: &RecordId) -> Result<Task> {
        info!("Starting task {}", id);
        Self::action(client, id, "start").await
    }

    pub async fn cancel(client: &ApiClient, id: &RecordId) -> Result<Task> {
        info!("Cancelling task {}", id);
        Self::action(client, id, "cancel").await
    }

    pub async fn logs(client: &ApiClient, id: &RecordId) -> Result<TaskLogs> {
        let path = Resource::Tasks.item(id).join("logs");
        client.get_json(Resource::Tasks, &path).await
    }

    /// List tasks matching `filter`
    pub async fn filter(client: &ApiClient, filter: &TaskFilter) -> Result<Vec<Task>> {
        let tasks = Self::list(client).await?;
        Ok(tasks.into_iter().filter(|t| filter.matches(t)).collect())
    }

    async fn action(client: &ApiClient, id: &RecordId, action: &str) -> Result<Task> {
        let path = Resource::Tasks.item(id).join(action);
        client
            .request_json(Resource::Tasks, &path, RequestOptions::post())
            .await
    }
}
