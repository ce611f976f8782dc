use serde::{de::DeserializeOwned, Serialize};
use shared::{
    ChatRequest, ChatResponse, CreateTaskRequest, DeleteResponse, LoginRequest, LoginResponse,
    RegisterRequest, Task, TaskId, UpdateTaskRequest, User,
};

use crate::error::ApiError;
use crate::session::Session;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

/// Stateless translator between user intents and backend requests. Holds no
/// task or session data; callers pass the session explicitly.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let body = encode(&RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let request = HttpRequest::new(Method::Post, "/api/auth/register").json(body);
        let response = self.exchange(request, "Registration failed").await?;
        if !response.is_success() {
            return Err(ApiError::Validation(response.body));
        }
        decode(&response)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = encode(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let request = HttpRequest::new(Method::Post, "/api/auth/login").json(body);
        let response = self.exchange(request, "Login failed").await?;
        if !response.is_success() {
            tracing::debug!(status = response.status, "login rejected");
            return Err(ApiError::Auth);
        }
        decode(&response)
    }

    /// Tasks in the order the backend returned them.
    pub async fn list_tasks(&self, session: &Session) -> Result<Vec<Task>, ApiError> {
        const FAILED: &str = "Failed to fetch tasks";
        let request = HttpRequest::new(Method::Get, "/api/tasks").bearer(&session.token);
        let response = self.checked(request, FAILED).await?;
        let tasks: Vec<Task> = decode(&response)?;
        for task in &tasks {
            task.validate().map_err(ApiError::Decode)?;
        }
        Ok(tasks)
    }

    pub async fn create_task(
        &self,
        session: &Session,
        title: &str,
        description: &str,
    ) -> Result<Task, ApiError> {
        let body = encode(&CreateTaskRequest {
            title: title.to_string(),
            description: description.to_string(),
        })?;
        let request = HttpRequest::new(Method::Post, "/api/tasks")
            .bearer(&session.token)
            .json(body);
        let response = self.checked(request, "Failed to create task").await?;
        decode_task(&response)
    }

    pub async fn update_task(
        &self,
        session: &Session,
        id: TaskId,
        patch: &UpdateTaskRequest,
    ) -> Result<Task, ApiError> {
        let request = HttpRequest::new(Method::Put, format!("/api/tasks/{id}"))
            .bearer(&session.token)
            .json(encode(patch)?);
        let response = self.checked(request, "Failed to update task").await?;
        decode_task(&response)
    }

    pub async fn delete_task(
        &self,
        session: &Session,
        id: TaskId,
    ) -> Result<DeleteResponse, ApiError> {
        let request =
            HttpRequest::new(Method::Delete, format!("/api/tasks/{id}")).bearer(&session.token);
        let response = self.checked(request, "Failed to delete task").await?;
        decode(&response)
    }

    /// Chat carries the user id in the body instead of a bearer credential.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let request = HttpRequest::new(Method::Post, "/api/chat").json(encode(request)?);
        let response = self.checked(request, "Chat request failed").await?;
        decode(&response)
    }

    async fn exchange(
        &self,
        request: HttpRequest,
        failure: &str,
    ) -> Result<HttpResponse, ApiError> {
        let method = request.method;
        let path = request.path.clone();
        tracing::debug!("{} {}", method.as_str(), path);

        match self.transport.send(request).await {
            Ok(response) => {
                tracing::debug!(status = response.status, "{} {} answered", method.as_str(), path);
                Ok(response)
            }
            Err(e) => {
                tracing::warn!("{} {} failed: {e}", method.as_str(), path);
                Err(ApiError::network(failure, &e))
            }
        }
    }

    async fn checked(&self, request: HttpRequest, failure: &str) -> Result<HttpResponse, ApiError> {
        let response = self.exchange(request, failure).await?;
        if !response.is_success() {
            return Err(ApiError::fetch(response.status, failure, response.body));
        }
        Ok(response)
    }
}

fn encode<B: Serialize>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body)
        .map_err(|e| ApiError::Decode(format!("Failed to serialize request: {e}")))
}

fn decode<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    serde_json::from_str(&response.body)
        .map_err(|e| ApiError::Decode(format!("Failed to parse JSON: {e}")))
}

fn decode_task(response: &HttpResponse) -> Result<Task, ApiError> {
    let task: Task = decode(response)?;
    task.validate().map_err(ApiError::Decode)?;
    Ok(task)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned responses and records what was sent.
    #[derive(Default)]
    pub(crate) struct Scripted {
        pub replies: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        pub sent: RefCell<Vec<HttpRequest>>,
    }

    impl Scripted {
        pub fn reply(self, status: u16, body: &str) -> Self {
            self.replies.borrow_mut().push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
            self
        }

        pub fn offline(self) -> Self {
            self.replies
                .borrow_mut()
                .push_back(Err(TransportError("Failed to fetch".into())));
            self
        }
    }

    #[async_trait(?Send)]
    impl Transport for Scripted {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.borrow_mut().push(request);
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("no scripted reply".into())))
        }
    }

    pub(crate) fn session() -> Session {
        Session {
            token: "secret".into(),
            user: User {
                id: 1,
                username: "ada".into(),
                email: "ada@example.com".into(),
            },
        }
    }

    #[tokio::test]
    async fn login_hides_backend_reason() {
        let api = ApiClient::new(Scripted::default().reply(403, "{\"detail\":\"account locked\"}"));
        let err = api.login("ada", "nope").await.unwrap_err();
        assert_eq!(err, ApiError::Auth);
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn register_surfaces_raw_body() {
        let api = ApiClient::new(Scripted::default().reply(400, "Username already taken"));
        let err = api.register("ada", "a@x.io", "pw").await.unwrap_err();
        assert_eq!(err, ApiError::Validation("Username already taken".into()));
    }

    #[tokio::test]
    async fn bearer_is_attached_to_task_calls_only() {
        let api = ApiClient::new(
            Scripted::default()
                .reply(200, "[]")
                .reply(200, r#"{"access_token":"t","user":{"id":1,"username":"a","email":"e"}}"#),
        );
        api.list_tasks(&session()).await.unwrap();
        api.login("a", "pw").await.unwrap();

        let sent = api.transport().sent.borrow();
        assert_eq!(sent[0].bearer.as_deref(), Some("secret"));
        assert!(sent[0].body.is_none());
        assert!(sent[1].bearer.is_none());
    }

    #[tokio::test]
    async fn update_sends_only_present_fields() {
        let api = ApiClient::new(Scripted::default().reply(404, "Task not found"));
        let err = api
            .update_task(&session(), 9, &UpdateTaskRequest::toggle(true))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Failed to update task");
        let sent = api.transport().sent.borrow();
        assert_eq!(sent[0].path, "/api/tasks/9");
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"completed":true}"#));
    }

    #[tokio::test]
    async fn network_failure_has_no_status() {
        let api = ApiClient::new(Scripted::default().offline());
        let err = api.list_tasks(&session()).await.unwrap_err();
        assert!(err.is_network());
        assert!(!err.is_unauthorized());
    }

    #[tokio::test]
    async fn error_body_is_never_parsed() {
        let api = ApiClient::new(Scripted::default().reply(500, "<html>boom</html>"));
        match api.delete_task(&session(), 2).await.unwrap_err() {
            ApiError::Fetch { status, detail, .. } => {
                assert_eq!(status, Some(500));
                assert_eq!(detail, "<html>boom</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn task_without_title_is_rejected() {
        let body = r#"[{"id":1,"user_id":1,"title":" ","description":"","completed":false,
            "created_at":"2025-01-01T00:00:00Z","updated_at":"2025-01-01T00:00:00Z"}]"#;
        let api = ApiClient::new(Scripted::default().reply(200, body));
        assert!(matches!(api.list_tasks(&session()).await, Err(ApiError::Decode(_))));
    }
}
