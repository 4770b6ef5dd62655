//! Session-local task list kept in step with the remote store.
//!
//! Local state only changes after the store confirms a call. Create appends the task
//! the store returned; toggle, rename and remove apply the change that was requested
//! once the store answers with a success status.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, error, info, warn};
use shared::{
    codec, CreateTaskRequest, DeleteTaskRequest, Filter, Task, TaskId, UpdateTaskRequest,
};

use crate::error::TodoError;
use crate::store::{StoreError, TaskStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    LoadAll,
    Create,
    ToggleCompleted,
    Remove,
    Rename,
    ImportBatch,
}

/// What happens to the caller when a remote call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log it, keep the last known good state, report nothing.
    LogAndContinue,
    /// Return the error so the user sees it.
    Propagate,
}

impl Operation {
    pub fn failure_policy(self) -> FailurePolicy {
        match self {
            Operation::ImportBatch => FailurePolicy::Propagate,
            Operation::LoadAll
            | Operation::Create
            | Operation::ToggleCompleted
            | Operation::Remove
            | Operation::Rename => FailurePolicy::LogAndContinue,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Operation::LoadAll => "load tasks",
            Operation::Create => "create task",
            Operation::ToggleCompleted => "toggle task",
            Operation::Remove => "delete task",
            Operation::Rename => "rename task",
            Operation::ImportBatch => "import tasks",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Default)]
struct Session {
    tasks: Vec<Task>,
    filter: Filter,
}

/// Owns the task list of one session.
///
/// Clones share the same session, so a clone can be moved into a pending future while
/// the UI keeps reading from the original. Calls are not serialised: if two calls touch
/// the same task, whichever answer arrives last wins for the field it changes.
pub struct TaskController<S> {
    store: Rc<S>,
    session: Rc<RefCell<Session>>,
}

impl<S> Clone for TaskController<S> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            session: Rc::clone(&self.session),
        }
    }
}

impl<S: TaskStore> TaskController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Rc::new(store),
            session: Rc::new(RefCell::new(Session::default())),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.session.borrow().tasks.clone()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.session.borrow().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.session.borrow().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn completed_count(&self) -> usize {
        Filter::Completed.apply(&self.session.borrow().tasks).count()
    }

    pub fn filter(&self) -> Filter {
        self.session.borrow().filter
    }

    pub fn set_filter(&self, filter: Filter) {
        self.session.borrow_mut().filter = filter;
    }

    /// How many tasks the current filter shows.
    pub fn remaining_count(&self) -> usize {
        let session = self.session.borrow();
        session.filter.apply(&session.tasks).count()
    }

    /// Tasks passing the current filter, in store order.
    pub fn visible_tasks(&self) -> Vec<Task> {
        let session = self.session.borrow();
        session.filter.apply(&session.tasks).cloned().collect()
    }

    pub async fn load_all(&self) {
        let result = self.store.fetch_all().await;
        let Ok(Some(tasks)) = settle(Operation::LoadAll, result) else {
            return;
        };
        info!("Loaded {} tasks", tasks.len());
        self.session.borrow_mut().tasks = tasks;
    }

    /// Callers trim `name` and skip blank input before calling.
    pub async fn create(&self, name: &str) {
        let request = CreateTaskRequest::new(name.to_string());
        let result = self.store.create(&request).await;
        let Ok(Some(task)) = settle(Operation::Create, result) else {
            return;
        };
        debug!("Created task {} '{}'", task.id, task.name);
        self.session.borrow_mut().tasks.push(task);
    }

    pub async fn toggle_completed(&self, id: TaskId) {
        let Some(current) = self.task(id).map(|task| task.completed) else {
            warn!("Ignoring toggle for unknown task {}", id);
            return;
        };
        let completed = !current;

        let result = self
            .store
            .update(&UpdateTaskRequest::completed(id, completed))
            .await;
        if let Ok(Some(())) = settle(Operation::ToggleCompleted, result) {
            debug!("Task {} completed={}", id, completed);
            self.modify(id, |task| task.completed = completed);
        }
    }

    pub async fn remove(&self, id: TaskId) {
        let result = self.store.delete(&DeleteTaskRequest { id }).await;
        if let Ok(Some(())) = settle(Operation::Remove, result) {
            debug!("Deleted task {}", id);
            self.session.borrow_mut().tasks.retain(|task| task.id != id);
        }
    }

    pub async fn rename(&self, id: TaskId, new_name: &str) {
        let result = self
            .store
            .update(&UpdateTaskRequest::renamed(id, new_name.to_string()))
            .await;
        if let Ok(Some(())) = settle(Operation::Rename, result) {
            debug!("Renamed task {} to '{}'", id, new_name);
            self.modify(id, |task| task.name = new_name.to_string());
        }
    }

    /// Send parsed tasks in one request, then reload to pick up store ids.
    pub async fn import_batch(&self, tasks: &[Task]) -> Result<(), TodoError> {
        let result = self.store.import(tasks).await;
        settle(Operation::ImportBatch, result)?;
        info!("Imported {} tasks", tasks.len());
        self.load_all().await;
        Ok(())
    }

    /// Parse `text` and import the result. Returns how many tasks were sent.
    pub async fn import_text(&self, text: &str) -> Result<usize, TodoError> {
        let tasks = codec::parse(text)?;
        self.import_batch(&tasks).await?;
        Ok(tasks.len())
    }

    /// The current list as an export report.
    pub fn export_text(&self) -> Result<String, TodoError> {
        let session = self.session.borrow();
        Ok(codec::format(&session.tasks)?)
    }

    fn modify(&self, id: TaskId, change: impl FnOnce(&mut Task)) {
        let mut session = self.session.borrow_mut();
        match session.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => change(task),
            None => warn!("Task {} vanished before its update was applied", id),
        }
    }
}

/// Route a remote result through the operation's failure policy.
///
/// `Ok(None)` means the failure was logged and swallowed.
fn settle<T>(operation: Operation, result: Result<T, StoreError>) -> Result<Option<T>, TodoError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(source) => {
            error!("Failed to {}: {}", operation, source);
            match operation.failure_policy() {
                FailurePolicy::LogAndContinue => Ok(None),
                FailurePolicy::Propagate => Err(TodoError::RemoteCallFailed { operation, source }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::collections::VecDeque;

    /// In-memory store behaving like the remote service.
    #[derive(Default)]
    struct FakeStore {
        remote: RefCell<Vec<Task>>,
        next_id: Cell<TaskId>,
        failing: Cell<bool>,
        fetch_calls: Cell<usize>,
        update_calls: Cell<usize>,
        bodies: RefCell<Vec<String>>,
        update_delays: RefCell<VecDeque<usize>>,
    }

    impl FakeStore {
        fn with_tasks(names: &[&str]) -> Self {
            let store = FakeStore::default();
            for name in names {
                store.insert(name);
            }
            store
        }

        fn insert(&self, name: &str) -> Task {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            let task = Task {
                id,
                name: name.trim().to_string(),
                completed: false,
                created_at: Some("2024-03-01 08:00:00".to_string()),
            };
            self.remote.borrow_mut().push(task.clone());
            task
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.failing.get() {
                return Err(StoreError::Status {
                    status: 500,
                    body: "Internal Server Error".to_string(),
                });
            }
            Ok(())
        }

        fn record(&self, body: &impl serde::Serialize) {
            self.bodies
                .borrow_mut()
                .push(serde_json::to_string(body).unwrap());
        }

        fn bad_request(message: &str) -> StoreError {
            StoreError::Status {
                status: 400,
                body: message.to_string(),
            }
        }
    }

    impl TaskStore for FakeStore {
        async fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
            self.fetch_calls.set(self.fetch_calls.get() + 1);
            self.check()?;
            Ok(self.remote.borrow().clone())
        }

        async fn create(&self, request: &CreateTaskRequest) -> Result<Task, StoreError> {
            self.record(request);
            self.check()?;
            if request.name.trim().is_empty() {
                return Err(Self::bad_request("Task name cannot be empty"));
            }
            Ok(self.insert(&request.name))
        }

        async fn update(&self, request: &UpdateTaskRequest) -> Result<(), StoreError> {
            self.update_calls.set(self.update_calls.get() + 1);
            self.record(request);
            let delay = self.update_delays.borrow_mut().pop_front().unwrap_or(0);
            for _ in 0..delay {
                tokio::task::yield_now().await;
            }
            self.check()?;

            let mut remote = self.remote.borrow_mut();
            let task = remote
                .iter_mut()
                .find(|t| t.id == request.id)
                .ok_or_else(|| Self::bad_request("Task not found"))?;
            if let Some(name) = &request.name {
                task.name = name.clone();
            }
            if let Some(completed) = request.completed {
                task.completed = completed;
            }
            Ok(())
        }

        async fn delete(&self, request: &DeleteTaskRequest) -> Result<(), StoreError> {
            self.record(request);
            self.check()?;
            let mut remote = self.remote.borrow_mut();
            let before = remote.len();
            remote.retain(|t| t.id != request.id);
            if remote.len() == before {
                return Err(Self::bad_request("Failed to delete task"));
            }
            Ok(())
        }

        async fn import(&self, tasks: &[Task]) -> Result<(), StoreError> {
            self.record(&tasks);
            self.check()?;
            for task in tasks {
                self.insert(&task.name);
            }
            Ok(())
        }
    }

    async fn loaded(names: &[&str]) -> TaskController<FakeStore> {
        let controller = TaskController::new(FakeStore::with_tasks(names));
        controller.load_all().await;
        controller
    }

    fn names(controller: &TaskController<FakeStore>) -> Vec<String> {
        controller.tasks().into_iter().map(|t| t.name).collect()
    }

    #[test]
    fn test_failure_policy_table() {
        assert_eq!(Operation::ImportBatch.failure_policy(), FailurePolicy::Propagate);
        for operation in [
            Operation::LoadAll,
            Operation::Create,
            Operation::ToggleCompleted,
            Operation::Remove,
            Operation::Rename,
        ] {
            assert_eq!(operation.failure_policy(), FailurePolicy::LogAndContinue);
        }
    }

    #[tokio::test]
    async fn test_load_all_replaces_collection_in_store_order() {
        let controller = loaded(&["Buy milk", "Walk dog"]).await;
        assert_eq!(names(&controller), vec!["Buy milk", "Walk dog"]);

        controller.store().insert("Read");
        controller.load_all().await;
        assert_eq!(names(&controller), vec!["Buy milk", "Walk dog", "Read"]);
    }

    #[tokio::test]
    async fn test_load_all_failure_keeps_state() {
        let controller = loaded(&["Buy milk"]).await;
        controller.store().failing.set(true);
        controller.store().insert("never seen");

        controller.load_all().await;
        assert_eq!(names(&controller), vec!["Buy milk"]);
    }

    #[tokio::test]
    async fn test_create_appends_store_task() {
        let controller = loaded(&["Buy milk"]).await;

        controller.create("  Walk dog ").await;

        assert_eq!(controller.len(), 2);
        let created = controller.tasks().pop().unwrap();
        assert_eq!(created.name, "Walk dog");
        assert_eq!(created.id, 2);
        assert!(!created.completed);
        assert!(created.created_at.is_some());
        assert_eq!(
            controller.store().bodies.borrow().last().unwrap(),
            r#"{"name":"  Walk dog ","completed":false}"#
        );
    }

    #[tokio::test]
    async fn test_create_failure_keeps_state() {
        let controller = loaded(&["Buy milk"]).await;
        controller.store().failing.set(true);

        controller.create("Walk dog").await;
        assert_eq!(names(&controller), vec!["Buy milk"]);

        // Rejected by the store, not by the controller.
        controller.store().failing.set(false);
        controller.create("   ").await;
        assert_eq!(controller.len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_flips_after_confirmation() {
        let controller = loaded(&["Buy milk"]).await;

        controller.toggle_completed(1).await;
        assert!(controller.task(1).unwrap().completed);
        assert_eq!(
            controller.store().bodies.borrow().last().unwrap(),
            r#"{"id":1,"completed":true}"#
        );

        controller.toggle_completed(1).await;
        assert!(!controller.task(1).unwrap().completed);
    }

    #[tokio::test]
    async fn test_toggle_unknown_id_is_noop() {
        let controller = loaded(&["Buy milk"]).await;
        let before = controller.tasks();

        controller.toggle_completed(42).await;

        assert_eq!(controller.tasks(), before);
        assert_eq!(controller.store().update_calls.get(), 0);
    }

    #[tokio::test]
    async fn test_toggle_failure_keeps_state() {
        let controller = loaded(&["Buy milk"]).await;
        controller.store().failing.set(true);

        controller.toggle_completed(1).await;
        assert!(!controller.task(1).unwrap().completed);
    }

    #[tokio::test]
    async fn test_remove_after_confirmation() {
        let controller = loaded(&["Buy milk", "Walk dog"]).await;

        controller.remove(1).await;
        assert_eq!(names(&controller), vec!["Walk dog"]);
        assert_eq!(controller.store().bodies.borrow().last().unwrap(), r#"{"id":1}"#);

        // Store refuses unknown ids; nothing changes locally.
        controller.remove(99).await;
        assert_eq!(names(&controller), vec!["Walk dog"]);
    }

    #[tokio::test]
    async fn test_remove_failure_keeps_state() {
        let controller = loaded(&["Buy milk"]).await;
        controller.store().failing.set(true);

        controller.remove(1).await;
        assert_eq!(names(&controller), vec!["Buy milk"]);
    }

    #[tokio::test]
    async fn test_rename_after_confirmation() {
        let controller = loaded(&["Buy milk"]).await;

        controller.rename(1, "Buy oat milk").await;
        assert_eq!(controller.task(1).unwrap().name, "Buy oat milk");
        assert_eq!(
            controller.store().bodies.borrow().last().unwrap(),
            r#"{"id":1,"name":"Buy oat milk"}"#
        );

        controller.store().failing.set(true);
        controller.rename(1, "Buy soy milk").await;
        assert_eq!(controller.task(1).unwrap().name, "Buy oat milk");
    }

    #[tokio::test]
    async fn test_concurrent_toggle_and_rename_both_apply() {
        for delays in [[3, 0], [0, 3]] {
            let controller = loaded(&["Buy milk"]).await;
            controller.store().update_delays.borrow_mut().extend(delays);

            futures::join!(controller.toggle_completed(1), controller.rename(1, "x"));

            let task = controller.task(1).unwrap();
            assert!(task.completed, "delays {:?}", delays);
            assert_eq!(task.name, "x", "delays {:?}", delays);
        }
    }

    #[tokio::test]
    async fn test_import_batch_reloads_with_store_ids() {
        let controller = loaded(&["Buy milk"]).await;
        let parsed = codec::parse("1. Walk dog\n2. Read\n").unwrap();

        controller.import_batch(&parsed).await.unwrap();

        let tasks = controller.tasks();
        let ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(names(&controller), vec!["Buy milk", "Walk dog", "Read"]);
        assert_eq!(controller.store().fetch_calls.get(), 2);
    }

    #[tokio::test]
    async fn test_import_batch_failure_propagates_without_reload() {
        let controller = loaded(&["Buy milk"]).await;
        controller.store().failing.set(true);
        let parsed = codec::parse("Walk dog").unwrap();

        let err = controller.import_batch(&parsed).await.unwrap_err();

        assert!(matches!(
            err,
            TodoError::RemoteCallFailed {
                operation: Operation::ImportBatch,
                source: StoreError::Status { status: 500, .. },
            }
        ));
        assert_eq!(err.to_string(), "import tasks failed: remote store answered 500: Internal Server Error");
        assert_eq!(names(&controller), vec!["Buy milk"]);
        assert_eq!(controller.store().fetch_calls.get(), 1);
    }

    #[tokio::test]
    async fn test_import_text_rejects_empty_before_sending() {
        let controller = loaded(&[]).await;
        let bodies_before = controller.store().bodies.borrow().len();

        let err = controller.import_text(" \n ").await.unwrap_err();

        assert!(matches!(err, TodoError::CodecFormat(shared::CodecError::EmptyContent)));
        assert_eq!(controller.store().bodies.borrow().len(), bodies_before);
    }

    #[tokio::test]
    async fn test_import_text_sends_placeholder_ids() {
        let controller = loaded(&[]).await;

        let count = controller.import_text("1. Walk dog\nRead\n").await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            controller.store().bodies.borrow().last().unwrap(),
            r#"[{"id":1,"name":"Walk dog","completed":false},{"id":2,"name":"Read","completed":false}]"#
        );
        assert_eq!(names(&controller), vec!["Walk dog", "Read"]);
    }

    #[tokio::test]
    async fn test_visible_tasks_follow_filter() {
        let controller = loaded(&["Buy milk", "Walk dog", "Read"]).await;
        controller.toggle_completed(2).await;
        assert_eq!(controller.remaining_count(), 3);

        controller.set_filter(Filter::Active);
        assert_eq!(controller.remaining_count(), 2);
        let visible: Vec<_> = controller.visible_tasks().into_iter().map(|t| t.name).collect();
        assert_eq!(visible, vec!["Buy milk", "Read"]);

        controller.set_filter(Filter::Completed);
        assert_eq!(controller.remaining_count(), 1);
        let visible: Vec<_> = controller.visible_tasks().into_iter().map(|t| t.name).collect();
        assert_eq!(visible, vec!["Walk dog"]);

        assert_eq!(controller.filter(), Filter::Completed);
        assert_eq!(controller.completed_count(), 1);
        assert_eq!(controller.len(), 3);
    }

    #[tokio::test]
    async fn test_export_text_lists_tasks_in_order() {
        let controller = loaded(&["Buy milk", "Walk dog"]).await;
        controller.toggle_completed(1).await;

        let report = controller.export_text().unwrap();

        assert!(report.contains("总任务数：2\n"));
        assert!(report.contains("已完成任务数：1\n"));
        let milk = report.find("1. Buy milk").unwrap();
        let dog = report.find("2. Walk dog").unwrap();
        assert!(milk < dog);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let first = loaded(&["Buy milk"]).await;
        let second = loaded(&["Walk dog", "Read"]).await;
        let clone = first.clone();

        clone.remove(1).await;

        assert!(first.is_empty());
        assert_eq!(second.len(), 2);
    }
}
