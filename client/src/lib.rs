//! Client core for the task dashboard: a stateless API client, the session
//! it is handed, and the view state kept in sync with the remote task store.

pub mod api;
pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod error;
pub mod local;
pub mod session;
pub mod sync;
pub mod tasks;
pub mod transport;

pub use api::ApiClient;
pub use error::{ApiError, TransportError};
pub use session::{Session, SessionStore};
pub use transport::{HttpRequest, HttpResponse, Method, Transport, DEFAULT_BASE_URL};

#[cfg(feature = "native")]
pub use transport::ReqwestTransport;
