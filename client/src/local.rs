//! Offline task list with client-generated identifiers. It never talks to a
//! backend and is an alternative to [`crate::tasks::TaskList`], not a layer
//! beneath it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalTask {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalTaskError {
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Title must be 200 characters or less")]
    TitleTooLong,
    #[error("Description must be 1000 characters or less")]
    DescriptionTooLong,
    #[error("Task {0} not found")]
    NotFound(Uuid),
}

#[derive(Debug, Clone, Default)]
pub struct LocalTaskList {
    tasks: Vec<LocalTask>,
}

impl LocalTaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, title: &str, description: &str) -> Result<&LocalTask, LocalTaskError> {
        let title = validate_title(title)?;
        validate_description(description)?;

        self.tasks.push(LocalTask {
            id: Uuid::new_v4(),
            title,
            description: description.to_string(),
            completed: false,
        });
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Insertion order.
    pub fn list(&self) -> &[LocalTask] {
        &self.tasks
    }

    pub fn get(&self, id: Uuid) -> Option<&LocalTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// `None` keeps the current value. Nothing changes unless every supplied
    /// field is valid.
    pub fn update(
        &mut self,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<&LocalTask, LocalTaskError> {
        let title = title.map(validate_title).transpose()?;
        if let Some(description) = description {
            validate_description(description)?;
        }

        let task = self.find_mut(id)?;
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = description {
            task.description = description.to_string();
        }
        Ok(&*task)
    }

    pub fn toggle(&mut self, id: Uuid) -> Result<bool, LocalTaskError> {
        let task = self.find_mut(id)?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<LocalTask, LocalTaskError> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(LocalTaskError::NotFound(id))?;
        Ok(self.tasks.remove(index))
    }

    fn find_mut(&mut self, id: Uuid) -> Result<&mut LocalTask, LocalTaskError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(LocalTaskError::NotFound(id))
    }
}

fn validate_title(title: &str) -> Result<String, LocalTaskError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(LocalTaskError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(LocalTaskError::TitleTooLong);
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> Result<(), LocalTaskError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(LocalTaskError::DescriptionTooLong);
    }
    Ok(())
}
