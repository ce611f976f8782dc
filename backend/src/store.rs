use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Client};
use shared::{ChatMessage, ConversationId, Task, TaskId, UpdateTaskRequest, User, UserId};
use tokio::sync::RwLock;

use crate::error::AppError;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Account {
    pub user: User,
    pub password_hash: String,
}

/// Persistence for users, their tasks and their chat conversations. Task
/// lookups are always scoped to the owning user.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> Result<User, AppError>;
    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, AppError>;
    async fn user(&self, id: UserId) -> Result<Option<User>, AppError>;

    /// Ordered by id, oldest first.
    async fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, AppError>;
    async fn insert_task(
        &self,
        owner: UserId,
        title: &str,
        description: &str,
    ) -> Result<Task, AppError>;
    async fn update_task(
        &self,
        owner: UserId,
        id: TaskId,
        patch: &UpdateTaskRequest,
    ) -> Result<Option<Task>, AppError>;
    async fn delete_task(&self, owner: UserId, id: TaskId) -> Result<bool, AppError>;

    async fn create_conversation(&self, owner: UserId) -> Result<ConversationId, AppError>;
    async fn owns_conversation(&self, owner: UserId, id: ConversationId) -> Result<bool, AppError>;
    async fn history(&self, id: ConversationId) -> Result<Vec<ChatMessage>, AppError>;
    async fn append_message(
        &self,
        id: ConversationId,
        message: &ChatMessage,
    ) -> Result<(), AppError>;
}

fn new_task(id: TaskId, owner: UserId, title: &str, description: &str) -> Task {
    let now = Utc::now();
    Task {
        id,
        user_id: owner,
        title: title.to_string(),
        description: description.to_string(),
        completed: false,
        created_at: now,
        updated_at: now,
    }
}

fn apply(task: &mut Task, patch: &UpdateTaskRequest) {
    if let Some(title) = &patch.title {
        task.title = title.clone();
    }
    if let Some(description) = &patch.description {
        task.description = description.clone();
    }
    if let Some(completed) = patch.completed {
        task.completed = completed;
    }
    task.updated_at = Utc::now();
}

#[derive(Default)]
struct Tables {
    next_user: UserId,
    next_task: TaskId,
    next_conversation: ConversationId,
    accounts: BTreeMap<UserId, Account>,
    tasks: BTreeMap<TaskId, Task>,
    conversations: HashMap<ConversationId, (UserId, Vec<ChatMessage>)>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        for account in tables.accounts.values() {
            if account.user.username == username {
                return Err(AppError::BadRequest("Username already registered".into()));
            }
            if account.user.email == email {
                return Err(AppError::BadRequest("Email already registered".into()));
            }
        }
        tables.next_user += 1;
        let user = User {
            id: tables.next_user,
            username: username.to_string(),
            email: email.to_string(),
        };
        tables.accounts.insert(
            user.id,
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(user)
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.user.username == username)
            .cloned())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.accounts.get(&id).map(|a| a.user.clone()))
    }

    async fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|t| t.user_id == owner)
            .cloned()
            .collect())
    }

    async fn insert_task(
        &self,
        owner: UserId,
        title: &str,
        description: &str,
    ) -> Result<Task, AppError> {
        let mut tables = self.tables.write().await;
        tables.next_task += 1;
        let task = new_task(tables.next_task, owner, title, description);
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        owner: UserId,
        id: TaskId,
        patch: &UpdateTaskRequest,
    ) -> Result<Option<Task>, AppError> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(&id) {
            Some(task) if task.user_id == owner => {
                apply(task, patch);
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_task(&self, owner: UserId, id: TaskId) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.tasks.get(&id).is_some_and(|t| t.user_id == owner) {
            tables.tasks.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn create_conversation(&self, owner: UserId) -> Result<ConversationId, AppError> {
        let mut tables = self.tables.write().await;
        tables.next_conversation += 1;
        let id = tables.next_conversation;
        tables.conversations.insert(id, (owner, Vec::new()));
        Ok(id)
    }

    async fn owns_conversation(&self, owner: UserId, id: ConversationId) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.conversations.get(&id).is_some_and(|(o, _)| *o == owner))
    }

    async fn history(&self, id: ConversationId) -> Result<Vec<ChatMessage>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .conversations
            .get(&id)
            .map(|(_, messages)| messages.clone())
            .unwrap_or_default())
    }

    async fn append_message(
        &self,
        id: ConversationId,
        message: &ChatMessage,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some((_, messages)) = tables.conversations.get_mut(&id) {
            messages.push(message.clone());
        }
        Ok(())
    }
}

/// Redis layout: JSON records under `user:{id}` and `task:{owner}:{id}`,
/// secondary indexes `username:{name}` and `email:{email}`, a list per
/// conversation under `messages:{id}`.
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    pub fn open(url: &str) -> Result<Self, AppError> {
        Ok(Self {
            client: Client::open(url)?,
        })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn task(&self, owner: UserId, id: TaskId) -> Result<Option<Task>, AppError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(format!("task:{owner}:{id}")).await?;
        raw.map(|json| serde_json::from_str(&json).map_err(AppError::from))
            .transpose()
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> Result<User, AppError> {
        let mut conn = self.conn().await?;
        if conn.exists(format!("username:{username}")).await? {
            return Err(AppError::BadRequest("Username already registered".into()));
        }
        if conn.exists(format!("email:{email}")).await? {
            return Err(AppError::BadRequest("Email already registered".into()));
        }

        let id: UserId = conn.incr("user:next_id", 1).await?;
        let claimed: bool = conn.set_nx(format!("username:{username}"), id).await?;
        if !claimed {
            return Err(AppError::BadRequest("Username already registered".into()));
        }
        let _: () = conn.set(format!("email:{email}"), id).await?;

        let account = Account {
            user: User {
                id,
                username: username.to_string(),
                email: email.to_string(),
            },
            password_hash,
        };
        let _: () = conn.set(format!("user:{id}"), serde_json::to_string(&account)?).await?;
        Ok(account.user)
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, AppError> {
        let mut conn = self.conn().await?;
        let id: Option<UserId> = conn.get(format!("username:{username}")).await?;
        let Some(id) = id else {
            return Ok(None);
        };
        let raw: Option<String> = conn.get(format!("user:{id}")).await?;
        raw.map(|json| serde_json::from_str(&json).map_err(AppError::from))
            .transpose()
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, AppError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(format!("user:{id}")).await?;
        let account: Option<Account> = raw.map(|json| serde_json::from_str(&json)).transpose()?;
        Ok(account.map(|a| a.user))
    }

    async fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, AppError> {
        let mut conn = self.conn().await?;
        let keys: Vec<String> = conn.keys(format!("task:{owner}:*")).await?;
        let mut tasks = Vec::with_capacity(keys.len());
        for key in keys {
            let raw: Option<String> = conn.get(&key).await?;
            if let Some(json) = raw {
                tasks.push(serde_json::from_str::<Task>(&json)?);
            }
        }
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn insert_task(
        &self,
        owner: UserId,
        title: &str,
        description: &str,
    ) -> Result<Task, AppError> {
        let mut conn = self.conn().await?;
        let id: TaskId = conn.incr("task:next_id", 1).await?;
        let task = new_task(id, owner, title, description);
        let _: () = conn
            .set(format!("task:{owner}:{id}"), serde_json::to_string(&task)?)
            .await?;
        Ok(task)
    }

    async fn update_task(
        &self,
        owner: UserId,
        id: TaskId,
        patch: &UpdateTaskRequest,
    ) -> Result<Option<Task>, AppError> {
        let Some(mut task) = self.task(owner, id).await? else {
            return Ok(None);
        };
        apply(&mut task, patch);
        let mut conn = self.conn().await?;
        let _: () = conn
            .set(format!("task:{owner}:{id}"), serde_json::to_string(&task)?)
            .await?;
        Ok(Some(task))
    }

    async fn delete_task(&self, owner: UserId, id: TaskId) -> Result<bool, AppError> {
        let mut conn = self.conn().await?;
        let deleted: usize = conn.del(format!("task:{owner}:{id}")).await?;
        Ok(deleted > 0)
    }

    async fn create_conversation(&self, owner: UserId) -> Result<ConversationId, AppError> {
        let mut conn = self.conn().await?;
        let id: ConversationId = conn.incr("conversation:next_id", 1).await?;
        let _: () = conn.set(format!("conversation:{id}"), owner).await?;
        Ok(id)
    }

    async fn owns_conversation(&self, owner: UserId, id: ConversationId) -> Result<bool, AppError> {
        let mut conn = self.conn().await?;
        let stored: Option<UserId> = conn.get(format!("conversation:{id}")).await?;
        Ok(stored == Some(owner))
    }

    async fn history(&self, id: ConversationId) -> Result<Vec<ChatMessage>, AppError> {
        let mut conn = self.conn().await?;
        let raw: Vec<String> = conn.lrange(format!("messages:{id}"), 0, -1).await?;
        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(AppError::from))
            .collect()
    }

    async fn append_message(
        &self,
        id: ConversationId,
        message: &ChatMessage,
    ) -> Result<(), AppError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .rpush(format!("messages:{id}"), serde_json::to_string(message)?)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tasks_are_scoped_to_their_owner() {
        let store = MemoryStore::new();
        let mine = store.insert_task(1, "Mine", "").await.unwrap();
        store.insert_task(2, "Theirs", "").await.unwrap();

        assert_eq!(store.list_tasks(1).await.unwrap().len(), 1);
        assert!(store
            .update_task(2, mine.id, &UpdateTaskRequest::toggle(true))
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_task(2, mine.id).await.unwrap());
        assert!(store.delete_task(1, mine.id).await.unwrap());
    }

    #[tokio::test]
    async fn patch_leaves_absent_fields_alone() {
        let store = MemoryStore::new();
        let task = store.insert_task(1, "Title", "Body").await.unwrap();
        let updated = store
            .update_task(1, task.id, &UpdateTaskRequest::toggle(true))
            .await
            .unwrap()
            .unwrap();

        assert!(updated.completed);
        assert_eq!(updated.title, "Title");
        assert_eq!(updated.description, "Body");
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        store.create_account("ada", "a@x.io", "h".into()).await.unwrap();
        let err = store.create_account("ada", "b@x.io", "h".into()).await.unwrap_err();
        assert_eq!(err.to_string(), "Username already registered");
    }
}
