//! Reference implementation of the task/chat HTTP surface the dashboard
//! client talks to. Used for local development and as the in-process server
//! behind the client's integration tests.

pub mod assistant;
pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::AppError;
pub use routes::router;
pub use state::AppState;
