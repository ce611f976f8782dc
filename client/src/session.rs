use serde::{Deserialize, Serialize};
use shared::{LoginResponse, User};

/// One authenticated client: the bearer credential and who it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl From<LoginResponse> for Session {
    fn from(response: LoginResponse) -> Self {
        Self {
            token: response.access_token,
            user: response.user,
        }
    }
}

/// Holds at most one session for the lifetime of a tab. Persistence is left
/// to the embedder through the JSON helpers.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    current: Option<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            current: Some(session),
        }
    }

    pub fn begin(&mut self, response: LoginResponse) -> &Session {
        tracing::info!(user = %response.user.username, "session started");
        self.current.insert(Session::from(response))
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn clear(&mut self) {
        if let Some(session) = self.current.take() {
            tracing::info!(user = %session.user.username, "session cleared");
        }
    }

    pub fn to_json(&self) -> Option<String> {
        self.current
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok())
    }

    /// Restores a persisted session. Unreadable data yields an empty store.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Session>(raw) {
            Ok(session) => Self::with_session(session),
            Err(e) => {
                tracing::warn!("discarding stored session: {e}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login() -> LoginResponse {
        LoginResponse {
            access_token: "tok".into(),
            token_type: "bearer".into(),
            user: User {
                id: 4,
                username: "ada".into(),
                email: "ada@example.com".into(),
            },
        }
    }

    #[test]
    fn begin_then_clear() {
        let mut store = SessionStore::new();
        assert!(!store.is_authenticated());

        store.begin(login());
        assert_eq!(store.token(), Some("tok"));
        assert_eq!(store.current().map(|s| s.user.id), Some(4));

        store.clear();
        assert!(store.current().is_none());
    }

    #[test]
    fn survives_json_persistence() {
        let mut store = SessionStore::new();
        store.begin(login());
        let raw = store.to_json().unwrap();

        let restored = SessionStore::from_json(&raw);
        assert_eq!(restored.current(), store.current());
        assert!(!SessionStore::from_json("{not json").is_authenticated());
    }
}
