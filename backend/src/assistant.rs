//! Built-in stand-in for the remote assistant. Understands a handful of task
//! commands and otherwise acknowledges the message.

use shared::{ChatMessage, UpdateTaskRequest, UserId};

use crate::error::AppError;
use crate::store::Store;

const HELP: &str = "I can manage your tasks. Try: \"add task buy milk\", \"list tasks\", \
\"complete task 3\" or \"delete task 3\".";

pub async fn respond(
    store: &dyn Store,
    user_id: UserId,
    message: &str,
    history: &[ChatMessage],
) -> Result<String, AppError> {
    let text = message.trim();
    let lower = text.to_lowercase();

    if let Some(title) = strip_command(text, &lower, "add task ") {
        let task = store.insert_task(user_id, title, "").await?;
        return Ok(format!("Added task #{}: \"{}\".", task.id, task.title));
    }

    if lower == "list tasks" || lower == "show tasks" {
        let tasks = store.list_tasks(user_id).await?;
        if tasks.is_empty() {
            return Ok("You have no tasks.".to_string());
        }
        let lines: Vec<String> = tasks
            .iter()
            .map(|t| format!("#{} [{}] {}", t.id, if t.completed { "x" } else { " " }, t.title))
            .collect();
        return Ok(format!("You have {} tasks:\n{}", tasks.len(), lines.join("\n")));
    }

    if let Some(id) = strip_command(text, &lower, "complete task ") {
        let Ok(id) = id.trim_start_matches('#').parse() else {
            return Ok(HELP.to_string());
        };
        return Ok(match store.update_task(user_id, id, &UpdateTaskRequest::toggle(true)).await? {
            Some(task) => format!("Marked \"{}\" as completed.", task.title),
            None => format!("I couldn't find task #{id}."),
        });
    }

    if let Some(id) = strip_command(text, &lower, "delete task ") {
        let Ok(id) = id.trim_start_matches('#').parse() else {
            return Ok(HELP.to_string());
        };
        return Ok(if store.delete_task(user_id, id).await? {
            format!("Deleted task #{id}.")
        } else {
            format!("I couldn't find task #{id}.")
        });
    }

    if history.is_empty() {
        Ok(format!("Hi! {HELP}"))
    } else {
        Ok(HELP.to_string())
    }
}

fn strip_command<'a>(text: &'a str, lower: &str, command: &str) -> Option<&'a str> {
    if lower.starts_with(command) && text.is_char_boundary(command.len()) {
        let rest = text[command.len()..].trim();
        (!rest.is_empty()).then_some(rest)
    } else {
        None
    }
}
