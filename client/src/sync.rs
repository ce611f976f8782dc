//! Mutate-then-reload flows. Each one performs a single user action against
//! the backend and, once it has changed something, fetches the whole task
//! collection again. The async controllers and the event-driven frontend both
//! run these and hand the result to [`crate::tasks::TaskList::apply`].

use shared::{Task, TaskId, UpdateTaskRequest};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::Session;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct Synced {
    /// Number of records the action changed, or why it failed.
    pub mutation: Result<usize, ApiError>,
    /// The collection fetched afterwards. `None` when the action changed
    /// nothing, so there was no reason to reload.
    pub reload: Option<Result<Vec<Task>, ApiError>>,
}

impl Synced {
    fn rejected(error: ApiError) -> Self {
        Self {
            mutation: Err(error),
            reload: None,
        }
    }

    /// The failure to report. A failed action outranks a failed reload.
    pub fn error(&self) -> Option<&ApiError> {
        match (&self.mutation, &self.reload) {
            (Err(e), _) | (Ok(_), Some(Err(e))) => Some(e),
            _ => None,
        }
    }
}

async fn reloaded<T: Transport>(
    api: &ApiClient<T>,
    session: &Session,
    mutation: Result<usize, ApiError>,
) -> Synced {
    Synced {
        mutation,
        reload: Some(api.list_tasks(session).await),
    }
}

pub async fn reload<T: Transport>(api: &ApiClient<T>, session: &Session) -> Synced {
    reloaded(api, session, Ok(0)).await
}

pub async fn create<T: Transport>(
    api: &ApiClient<T>,
    session: &Session,
    title: &str,
    description: &str,
) -> Synced {
    match api.create_task(session, title, description).await {
        Ok(_) => reloaded(api, session, Ok(1)).await,
        Err(e) => Synced::rejected(e),
    }
}

pub async fn update<T: Transport>(
    api: &ApiClient<T>,
    session: &Session,
    id: TaskId,
    patch: &UpdateTaskRequest,
) -> Synced {
    match api.update_task(session, id, patch).await {
        Ok(_) => reloaded(api, session, Ok(1)).await,
        Err(e) => Synced::rejected(e),
    }
}

pub async fn delete<T: Transport>(api: &ApiClient<T>, session: &Session, id: TaskId) -> Synced {
    match api.delete_task(session, id).await {
        Ok(_) => reloaded(api, session, Ok(1)).await,
        Err(e) => Synced::rejected(e),
    }
}

/// Deletes `ids` one by one, stopping at the first failure. The collection is
/// reloaded once whatever happened, since earlier deletes may have landed.
pub async fn clear_completed<T: Transport>(
    api: &ApiClient<T>,
    session: &Session,
    ids: &[TaskId],
) -> Synced {
    let mut removed = 0;
    for &id in ids {
        if let Err(e) = api.delete_task(session, id).await {
            tracing::warn!(removed, "clearing completed tasks stopped at {id}: {e}");
            return reloaded(api, session, Err(e)).await;
        }
        removed += 1;
    }
    reloaded(api, session, Ok(removed)).await
}
