use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use shared::{
    ChatMessage, ChatRequest, ChatResponse, CreateTaskRequest, DeleteResponse, LoginRequest,
    LoginResponse, RegisterRequest, Task, TaskId, UpdateTaskRequest, User,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::assistant;
use crate::auth::{hash_password, issue_token, verify_password, AuthUser};
use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/:id", put(update_task).delete(delete_task))
        .route("/api/chat", post(chat))
        .fallback_service(ServeDir::new("frontend/dist"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if payload.username.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(AppError::BadRequest("Username, email and password are required".into()));
    }
    let hash = hash_password(&payload.password)?;
    let user = state
        .store
        .create_account(payload.username.trim(), payload.email.trim(), hash)
        .await?;
    tracing::info!(user = %user.username, "registered");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let account = state
        .store
        .account_by_username(&payload.username)
        .await?
        .filter(|a| verify_password(&payload.password, &a.password_hash))
        .ok_or(AppError::Unauthorized("Incorrect username or password"))?;

    let access_token = issue_token(account.user.id, &state.jwt_secret)?;
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: account.user,
    }))
}

async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.store.list_tasks(user_id).await?;
    tracing::debug!(user_id, "found {} tasks", tasks.len());
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".into()));
    }
    let task = state
        .store
        .insert_task(user_id, &payload.title, &payload.description)
        .await?;
    tracing::debug!(user_id, task_id = task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<TaskId>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    if payload.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("Title is required".into()));
    }
    state
        .store
        .update_task(user_id, id, &payload)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Task not found"))
}

async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<TaskId>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !state.store.delete_task(user_id, id).await? {
        return Err(AppError::NotFound("Task not found"));
    }
    Ok(Json(DeleteResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let user = state
        .store
        .user(request.user_id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    let conversation_id = match request.conversation_id {
        Some(id) => {
            if !state.store.owns_conversation(user.id, id).await? {
                return Err(AppError::NotFound("Conversation not found"));
            }
            id
        }
        None => state.store.create_conversation(user.id).await?,
    };

    let history = state.store.history(conversation_id).await?;
    state
        .store
        .append_message(conversation_id, &ChatMessage::user(request.message.clone()))
        .await?;

    let response =
        assistant::respond(state.store.as_ref(), user.id, &request.message, &history).await?;
    state
        .store
        .append_message(conversation_id, &ChatMessage::assistant(response.clone()))
        .await?;

    Ok(Json(ChatResponse {
        conversation_id,
        response,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::in_memory("test-secret"))
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn tasks_require_a_bearer() {
        let response = app()
            .oneshot(Request::builder().uri("/api/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = app();
        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                r#"{"username":"ada","email":"ada@x.io","password":"pw"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let rejected = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                r#"{"username":"ada","password":"nope"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(rejected.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Incorrect username or password");
    }

    #[tokio::test]
    async fn chat_for_unknown_user_is_not_found() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/chat",
                r#"{"message":"hi","conversation_id":null,"user_id":77}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
