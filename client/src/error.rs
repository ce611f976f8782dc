use thiserror::Error;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Every failure the API client can surface. The client never recovers from
/// these itself; callers decide what to show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Registration rejected; carries the backend's error text verbatim.
    #[error("{0}")]
    Validation(String),

    /// Login rejected. The backend's reason is never surfaced.
    #[error("Invalid credentials")]
    Auth,

    /// Any other failed call. `status` is `None` when no response arrived.
    #[error("{message}")]
    Fetch {
        status: Option<u16>,
        message: String,
        detail: String,
    },

    /// A success response whose body was not the expected record.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn fetch(status: u16, message: &str, body: String) -> Self {
        ApiError::Fetch {
            status: Some(status),
            message: message.to_string(),
            detail: body,
        }
    }

    pub fn network(message: &str, cause: &TransportError) -> Self {
        ApiError::Fetch {
            status: None,
            message: message.to_string(),
            detail: cause.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Fetch { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Auth) || self.status() == Some(401)
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Fetch { status: None, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request failed: {0}")]
pub struct TransportError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_401_counts_as_unauthorized() {
        assert!(ApiError::fetch(401, "Failed to fetch tasks", String::new()).is_unauthorized());
        assert!(!ApiError::fetch(500, "Failed to fetch tasks", String::new()).is_unauthorized());

        let offline = ApiError::network(
            "Failed to fetch tasks",
            &TransportError("connection refused".into()),
        );
        assert!(offline.is_network());
        assert!(!offline.is_unauthorized());
    }

    #[test]
    fn auth_message_is_generic() {
        assert_eq!(ApiError::Auth.to_string(), INVALID_CREDENTIALS);
    }
}
