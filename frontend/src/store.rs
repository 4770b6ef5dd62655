//! The remote task store as seen by the controller.
//!
//! `update`, `delete` and `import` only report success or failure. The store does not
//! have to echo the new state back; the controller applies the change it asked for.

use shared::{CreateTaskRequest, DeleteTaskRequest, Task, UpdateTaskRequest};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("remote store answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid JSON payload: {0}")]
    Decode(#[from] serde_json::Error),
}

// Futures are not required to be Send: everything runs on the browser's event loop.
#[allow(async_fn_in_trait)]
pub trait TaskStore {
    async fn fetch_all(&self) -> Result<Vec<Task>, StoreError>;

    async fn create(&self, request: &CreateTaskRequest) -> Result<Task, StoreError>;

    async fn update(&self, request: &UpdateTaskRequest) -> Result<(), StoreError>;

    async fn delete(&self, request: &DeleteTaskRequest) -> Result<(), StoreError>;

    async fn import(&self, tasks: &[Task]) -> Result<(), StoreError>;
}
