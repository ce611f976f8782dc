use shared::{Task, TaskId, UpdateTaskRequest};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::{Session, SessionStore};
use crate::sync::{self, Synced};
use crate::tasks::{Counts, Filter, TaskList};
use crate::transport::Transport;

/// What the view should do after a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Credential rejected; the session has been cleared.
    Reauthenticate,
    Alert(String),
}

impl Failure {
    /// Only an explicit 401 ends the session. Connectivity problems are
    /// reported like any other error.
    pub fn classify(error: &ApiError) -> Self {
        if error.is_unauthorized() {
            Failure::Reauthenticate
        } else {
            Failure::Alert(error.to_string())
        }
    }
}

/// Controller for the task dashboard: one task list per instance, plus the
/// filter, search and new-task draft the view binds to.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub session: SessionStore,
    pub tasks: TaskList,
    pub filter: Filter,
    pub query: String,
    pub draft_title: String,
    pub draft_description: String,
}

impl Dashboard {
    pub fn new(session: SessionStore) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    pub fn visible(&self) -> Vec<&Task> {
        self.tasks.visible(self.filter, &self.query)
    }

    pub fn counts(&self) -> Counts {
        self.tasks.counts()
    }

    pub fn logout(&mut self) {
        self.session.clear();
        self.tasks = TaskList::new();
    }

    /// The new-task draft, or `None` while its title is blank.
    pub fn draft(&self) -> Option<(String, String)> {
        if self.draft_title.trim().is_empty() {
            return None;
        }
        Some((self.draft_title.clone(), self.draft_description.clone()))
    }

    /// Applies the outcome of any task action.
    pub fn apply(&mut self, synced: Synced) -> Result<(), Failure> {
        let result = self.tasks.apply(synced).map(drop);
        self.settle(result)
    }

    /// Applies the outcome of submitting the draft. The draft survives a
    /// rejected create so nothing the user typed is lost.
    pub fn apply_created(&mut self, synced: Synced) -> Result<(), Failure> {
        if synced.mutation.is_ok() {
            self.draft_title.clear();
            self.draft_description.clear();
        }
        self.apply(synced)
    }

    pub async fn load<T: Transport>(&mut self, api: &ApiClient<T>) -> Result<(), Failure> {
        let session = self.require_session()?;
        self.tasks.set_loading(true);
        self.apply(sync::reload(api, &session).await)
    }

    /// Submits the draft. A blank title is not sent.
    pub async fn add<T: Transport>(&mut self, api: &ApiClient<T>) -> Result<(), Failure> {
        let Some((title, description)) = self.draft() else {
            return Ok(());
        };
        let session = self.require_session()?;
        self.apply_created(sync::create(api, &session, &title, &description).await)
    }

    pub async fn toggle<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        id: TaskId,
    ) -> Result<(), Failure> {
        let session = self.require_session()?;
        let Some(patch) = self.tasks.toggle_patch(id) else {
            return Ok(());
        };
        self.apply(sync::update(api, &session, id, &patch).await)
    }

    pub async fn edit<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        id: TaskId,
        title: String,
        description: String,
    ) -> Result<(), Failure> {
        let session = self.require_session()?;
        let patch = UpdateTaskRequest::edit(title, description);
        self.apply(sync::update(api, &session, id, &patch).await)
    }

    pub async fn delete<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        id: TaskId,
    ) -> Result<(), Failure> {
        let session = self.require_session()?;
        self.apply(sync::delete(api, &session, id).await)
    }

    pub async fn clear_completed<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
    ) -> Result<(), Failure> {
        let session = self.require_session()?;
        let ids = self.tasks.completed_ids();
        if ids.is_empty() {
            return Ok(());
        }
        self.apply(sync::clear_completed(api, &session, &ids).await)
    }

    pub fn fail(&mut self, error: &ApiError) -> Failure {
        let failure = Failure::classify(error);
        match &failure {
            Failure::Reauthenticate => {
                tracing::warn!("credential rejected, signing out");
                self.logout();
            }
            Failure::Alert(message) => tracing::error!("{message}"),
        }
        failure
    }

    fn require_session(&self) -> Result<Session, Failure> {
        self.session.current().cloned().ok_or(Failure::Reauthenticate)
    }

    fn settle(&mut self, result: Result<(), ApiError>) -> Result<(), Failure> {
        result.map_err(|e| self.fail(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{session, Scripted};

    fn dashboard() -> Dashboard {
        Dashboard::new(SessionStore::with_session(session()))
    }

    #[tokio::test]
    async fn unauthorized_forces_sign_in() {
        let api = ApiClient::new(Scripted::default().reply(401, "Invalid token"));
        let mut dash = dashboard();

        assert_eq!(dash.load(&api).await, Err(Failure::Reauthenticate));
        assert!(!dash.session.is_authenticated());
    }

    #[tokio::test]
    async fn outage_keeps_the_session() {
        let api = ApiClient::new(Scripted::default().offline());
        let mut dash = dashboard();

        assert_eq!(
            dash.load(&api).await,
            Err(Failure::Alert("Failed to fetch tasks".into()))
        );
        assert!(dash.session.is_authenticated());
    }

    #[tokio::test]
    async fn blank_draft_is_not_submitted() {
        let api = ApiClient::new(Scripted::default());
        let mut dash = dashboard();
        dash.draft_title = "   ".into();

        assert_eq!(dash.add(&api).await, Ok(()));
        assert!(api.transport().sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn signed_out_dashboard_does_not_call_out() {
        let api = ApiClient::new(Scripted::default());
        let mut dash = Dashboard::default();
        assert_eq!(dash.load(&api).await, Err(Failure::Reauthenticate));
        assert!(api.transport().sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn rejected_create_keeps_the_draft() {
        let api = ApiClient::new(Scripted::default().reply(500, "db down"));
        let mut dash = dashboard();
        dash.draft_title = "Buy milk".into();
        dash.draft_description = "semi-skimmed".into();

        assert_eq!(
            dash.add(&api).await,
            Err(Failure::Alert("Failed to create task".into()))
        );
        assert_eq!(dash.draft_title, "Buy milk");
        assert_eq!(dash.draft_description, "semi-skimmed");
    }

    #[tokio::test]
    async fn accepted_create_clears_the_draft() {
        let created = r#"{"id":1,"user_id":1,"title":"Buy milk","description":"","completed":false,
            "created_at":"2025-01-01T00:00:00Z","updated_at":"2025-01-01T00:00:00Z"}"#;
        let api = ApiClient::new(
            Scripted::default()
                .reply(201, created)
                .reply(200, &format!("[{created}]")),
        );
        let mut dash = dashboard();
        dash.draft_title = "Buy milk".into();

        assert_eq!(dash.add(&api).await, Ok(()));
        assert!(dash.draft_title.is_empty());
        assert_eq!(dash.counts().total, 1);
    }
}
