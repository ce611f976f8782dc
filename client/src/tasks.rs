use shared::{Task, TaskId, UpdateTaskRequest};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::Session;
use crate::sync::{self, Synced};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn admits(&self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Active => "Active",
            Filter::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

/// Client-owned copy of the task collection. After every successful mutation
/// the whole collection is fetched again; nothing is patched locally.
#[derive(Debug, Clone, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
    loading: bool,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Installs a freshly fetched collection as-is, keeping backend order.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        tracing::debug!("task list replaced with {} tasks", tasks.len());
        self.tasks = tasks;
        self.loading = false;
    }

    pub fn visible(&self, filter: Filter, query: &str) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| filter.admits(t) && t.matches(query))
            .collect()
    }

    pub fn counts(&self) -> Counts {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        Counts {
            total: self.tasks.len(),
            active: self.tasks.len() - completed,
            completed,
        }
    }

    pub fn completed_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().filter(|t| t.completed).map(|t| t.id).collect()
    }

    /// Patch that flips the displayed completion state. `None` for a task
    /// this list does not show.
    pub fn toggle_patch(&self, id: TaskId) -> Option<UpdateTaskRequest> {
        self.get(id).map(|t| UpdateTaskRequest::toggle(!t.completed))
    }

    /// Installs whatever the backend reported after an action and returns
    /// how many records the action changed. The action's own failure is
    /// reported ahead of a failed reload.
    pub fn apply(&mut self, synced: Synced) -> Result<usize, ApiError> {
        let Synced { mutation, reload } = synced;
        self.loading = false;
        let reloaded = reload.map(|fetched| fetched.map(|tasks| self.replace(tasks)));
        let changed = mutation?;
        reloaded.transpose()?;
        Ok(changed)
    }

    pub async fn refresh<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        session: &Session,
    ) -> Result<(), ApiError> {
        self.loading = true;
        self.apply(sync::reload(api, session).await).map(drop)
    }

    pub async fn create<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        session: &Session,
        title: &str,
        description: &str,
    ) -> Result<(), ApiError> {
        self.apply(sync::create(api, session, title, description).await)
            .map(drop)
    }

    pub async fn update<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        session: &Session,
        id: TaskId,
        patch: &UpdateTaskRequest,
    ) -> Result<(), ApiError> {
        self.apply(sync::update(api, session, id, patch).await).map(drop)
    }

    /// Flips completion based on the currently displayed state. Ids the
    /// list does not show are ignored.
    pub async fn toggle<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        session: &Session,
        id: TaskId,
    ) -> Result<(), ApiError> {
        let Some(patch) = self.toggle_patch(id) else {
            tracing::debug!("task {id} is not in the list, nothing to toggle");
            return Ok(());
        };
        self.update(api, session, id, &patch).await
    }

    pub async fn delete<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        session: &Session,
        id: TaskId,
    ) -> Result<(), ApiError> {
        self.apply(sync::delete(api, session, id).await).map(drop)
    }

    /// Deletes every completed task, stopping at the first failure, then
    /// re-fetches once.
    pub async fn clear_completed<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        session: &Session,
    ) -> Result<usize, ApiError> {
        let ids = self.completed_ids();
        self.apply(sync::clear_completed(api, session, &ids).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{session, Scripted};
    use chrono::Utc;

    fn task(id: TaskId, title: &str, description: &str, completed: bool) -> Task {
        let now = Utc::now();
        Task {
            id,
            user_id: 1,
            title: title.into(),
            description: description.into(),
            completed,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> TaskList {
        let mut list = TaskList::new();
        list.replace(vec![
            task(3, "Buy milk", "two litres", false),
            task(1, "File taxes", "", true),
            task(2, "Call mum", "about the MILK order", false),
        ]);
        list
    }

    #[test]
    fn active_and_completed_partition_the_list() {
        let list = sample();
        let active = list.visible(Filter::Active, "");
        let completed = list.visible(Filter::Completed, "");

        assert_eq!(active.len() + completed.len(), list.tasks().len());
        assert!(active.iter().all(|a| completed.iter().all(|c| a.id != c.id)));
        assert_eq!(list.counts(), Counts { total: 3, active: 2, completed: 1 });
    }

    #[test]
    fn keeps_backend_order() {
        let ids: Vec<_> = sample().tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn search_covers_title_and_description() {
        let list = sample();
        let hits: Vec<_> = list.visible(Filter::All, "milk").iter().map(|t| t.id).collect();
        assert_eq!(hits, vec![3, 2]);
        assert!(list.visible(Filter::Completed, "milk").is_empty());
    }

    #[tokio::test]
    async fn mutation_is_followed_by_full_refetch() {
        let created = r#"{"id":5,"user_id":1,"title":"New","description":"","completed":false,
            "created_at":"2025-01-01T00:00:00Z","updated_at":"2025-01-01T00:00:00Z"}"#;
        let api = ApiClient::new(
            Scripted::default()
                .reply(201, created)
                .reply(200, &format!("[{created}]")),
        );
        let mut list = TaskList::new();
        list.create(&api, &session(), "New", "").await.unwrap();

        let sent = api.transport().sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].path, "/api/tasks");
        assert_eq!(list.tasks().len(), 1);
        assert!(!list.is_loading());
    }

    #[tokio::test]
    async fn failed_mutation_leaves_list_untouched() {
        let api = ApiClient::new(Scripted::default().reply(404, "Task not found"));
        let mut list = sample();
        let err = list.delete(&api, &session(), 42).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(list.tasks().len(), 3);
        assert_eq!(api.transport().sent.borrow().len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_is_reported_over_failed_reload() {
        let api = ApiClient::new(Scripted::default().reply(500, "db down").offline());
        let mut list = sample();
        let err = list.clear_completed(&api, &session()).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to delete task");
        assert_eq!(err.status(), Some(500));
        assert_eq!(list.tasks().len(), 3);
    }

    #[tokio::test]
    async fn partial_clear_still_reloads() {
        let remaining = r#"[{"id":2,"user_id":1,"title":"Call mum","description":"",
            "completed":false,
            "created_at":"2025-01-01T00:00:00Z","updated_at":"2025-01-01T00:00:00Z"}]"#;
        let api = ApiClient::new(
            Scripted::default()
                .reply(200, r#"{"message":"Task deleted successfully"}"#)
                .reply(404, "Task not found")
                .reply(200, remaining),
        );
        let mut list = sample();
        list.replace(vec![
            task(1, "File taxes", "", true),
            task(2, "Call mum", "", false),
            task(4, "Old chore", "", true),
        ]);

        let err = list.clear_completed(&api, &session()).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(list.tasks().len(), 1);
        assert_eq!(api.transport().sent.borrow().len(), 3);
    }

    #[tokio::test]
    async fn toggling_an_unlisted_task_sends_nothing() {
        let api = ApiClient::new(Scripted::default());
        let mut list = TaskList::new();

        assert_eq!(list.toggle(&api, &session(), 99).await, Ok(()));
        assert!(api.transport().sent.borrow().is_empty());
        assert!(list.toggle_patch(99).is_none());
    }
}
