#![allow(dead_code)]

use backend::{router, AppState};
use client::{ApiClient, ReqwestTransport, Session};

pub async fn spawn_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(AppState::in_memory("integration-secret")))
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

pub async fn api() -> ApiClient<ReqwestTransport> {
    ApiClient::new(ReqwestTransport::new(spawn_backend().await))
}

pub async fn signed_in(api: &ApiClient<ReqwestTransport>, username: &str) -> Session {
    let email = format!("{username}@example.com");
    api.register(username, &email, "correct horse").await.unwrap();
    Session::from(api.login(username, "correct horse").await.unwrap())
}
