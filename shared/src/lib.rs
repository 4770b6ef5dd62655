use serde::{Deserialize, Serialize};

pub mod codec;
pub mod error;
pub mod validate;

pub use error::{CodecError, ValidationError};

/// Identifier assigned by the remote store.
pub type TaskId = i32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
    /// Opaque timestamp set by the store, only ever displayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub completed: bool,
}

/// Partial update; absent fields are left untouched by the store.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteTaskRequest {
    pub id: TaskId,
}

impl Task {
    pub fn new(id: TaskId, name: String) -> Self {
        Self {
            id,
            name,
            completed: false,
            created_at: None,
        }
    }
}

impl CreateTaskRequest {
    pub fn new(name: String) -> Self {
        Self {
            name,
            completed: false,
        }
    }
}

impl UpdateTaskRequest {
    pub fn completed(id: TaskId, completed: bool) -> Self {
        Self {
            id,
            name: None,
            completed: Some(completed),
        }
    }

    pub fn renamed(id: TaskId, name: String) -> Self {
        Self {
            id,
            name: Some(name),
            completed: None,
        }
    }
}

/// Display predicate over the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    pub fn name(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Active => "Active",
            Filter::Completed => "Completed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|filter| filter.name() == name)
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    pub fn apply<'a>(self, tasks: &'a [Task]) -> impl Iterator<Item = &'a Task> + 'a {
        tasks.iter().filter(move |task| self.matches(task))
    }
}
