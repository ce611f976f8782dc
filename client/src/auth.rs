use shared::{LoginResponse, User};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::SessionStore;
use crate::transport::Transport;

pub const ACCOUNT_CREATED: &str = "Account created! Please login.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A session was stored; the caller should show the dashboard.
    SignedIn,
    /// The account exists; the form is back in login mode.
    Registered,
    Failed,
}

/// State behind the login/register form.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub mode: AuthMode,
    pub username: String,
    pub email: String,
    pub password: String,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub loading: bool,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn switch_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.error = None;
        self.notice = None;
    }

    pub fn start(&mut self) {
        self.error = None;
        self.notice = None;
        self.loading = true;
    }

    pub fn signed_in(&mut self, response: LoginResponse, store: &mut SessionStore) {
        store.begin(response);
        self.password.clear();
        self.loading = false;
    }

    pub fn registered(&mut self, user: &User) {
        tracing::info!(user = %user.username, "account registered");
        self.mode = AuthMode::Login;
        self.notice = Some(ACCOUNT_CREATED.to_string());
        self.loading = false;
    }

    pub fn failed(&mut self, error: &ApiError) {
        self.error = Some(error.to_string());
        self.loading = false;
    }

    /// Installs the server's answer to a submitted form.
    pub fn finish(&mut self, reply: AuthReply, store: &mut SessionStore) -> AuthOutcome {
        match reply {
            AuthReply::SignedIn(response) => {
                self.signed_in(response, store);
                AuthOutcome::SignedIn
            }
            AuthReply::Registered(user) => {
                self.registered(&user);
                AuthOutcome::Registered
            }
            AuthReply::Failed(e) => {
                self.failed(&e);
                AuthOutcome::Failed
            }
        }
    }

    pub async fn submit<T: Transport>(
        &mut self,
        api: &ApiClient<T>,
        store: &mut SessionStore,
    ) -> AuthOutcome {
        self.start();
        let reply = request(api, self).await;
        self.finish(reply, store)
    }
}

/// Server answer to a login or register submission.
#[derive(Debug, Clone)]
pub enum AuthReply {
    SignedIn(LoginResponse),
    Registered(User),
    Failed(ApiError),
}

/// Sends the form in its current mode without touching any state.
pub async fn request<T: Transport>(api: &ApiClient<T>, form: &LoginForm) -> AuthReply {
    match form.mode {
        AuthMode::Login => match api.login(&form.username, &form.password).await {
            Ok(response) => AuthReply::SignedIn(response),
            Err(e) => AuthReply::Failed(e),
        },
        AuthMode::Register => {
            match api.register(&form.username, &form.email, &form.password).await {
                Ok(user) => AuthReply::Registered(user),
                Err(e) => AuthReply::Failed(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::Scripted;

    #[tokio::test]
    async fn register_then_login() {
        let api = ApiClient::new(
            Scripted::default()
                .reply(201, r#"{"id":3,"username":"ada","email":"ada@x.io"}"#)
                .reply(
                    200,
                    r#"{"access_token":"jwt","token_type":"bearer",
                        "user":{"id":3,"username":"ada","email":"ada@x.io"}}"#,
                ),
        );
        let mut store = SessionStore::new();
        let mut form = LoginForm::new();
        form.switch_mode();
        form.username = "ada".into();
        form.email = "ada@x.io".into();
        form.password = "pw".into();

        assert_eq!(form.submit(&api, &mut store).await, AuthOutcome::Registered);
        assert_eq!(form.mode, AuthMode::Login);
        assert_eq!(form.notice.as_deref(), Some(ACCOUNT_CREATED));
        assert!(!store.is_authenticated());

        assert_eq!(form.submit(&api, &mut store).await, AuthOutcome::SignedIn);
        assert_eq!(store.token(), Some("jwt"));
        assert!(form.password.is_empty());
    }

    #[tokio::test]
    async fn bad_login_shows_generic_error() {
        let api = ApiClient::new(Scripted::default().reply(401, "Incorrect password for ada"));
        let mut store = SessionStore::new();
        let mut form = LoginForm::new();

        assert_eq!(form.submit(&api, &mut store).await, AuthOutcome::Failed);
        assert_eq!(form.error.as_deref(), Some("Invalid credentials"));
        assert!(!form.loading);
    }
}
