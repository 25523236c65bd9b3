use std::sync::Arc;

use crate::dashboard::Dashboard;
use crate::errors::DashboardError;
use crate::notify::Notification;
use crate::prefs::{KEY_AUTH_TOKEN, KEY_USERNAME};

pub const CANNOT_CONNECT: &str = "Cannot connect to server";
pub const LOGIN_FAILED: &str = "Login failed";

impl Dashboard {
    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.logged_in
    }

    pub async fn is_logging_in(&self) -> bool {
        self.state.read().await.logging_in
    }

    pub async fn username(&self) -> String {
        self.state.read().await.username.clone()
    }

    /// Human-readable reason of the last failed login, empty otherwise.
    pub async fn login_error(&self) -> String {
        self.state.read().await.login_error.clone()
    }

    /// Authenticate, persist the credential, start the auto-refresh timer and
    /// begin populating the caches. Returns once the credential is stored; a
    /// slow endpoint only delays its own mirror.
    pub async fn login(self: &Arc<Self>, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            return false;
        }
        {
            let mut state = self.state.write().await;
            state.logging_in = true;
            state.login_error.clear();
        }

        let result = self.api.login(username, password).await;

        let token = {
            let mut state = self.state.write().await;
            state.logging_in = false;
            match result {
                Ok(token) => {
                    state.logged_in = true;
                    state.username = username.to_string();
                    token
                }
                Err(err) => {
                    self.log_failure("Login error", &err);
                    state.login_error = match err {
                        e if e.is_connectivity() => CANNOT_CONNECT.to_string(),
                        DashboardError::Rejected { message, .. } => {
                            message.unwrap_or_else(|| LOGIN_FAILED.to_string())
                        }
                        other => other.to_string(),
                    };
                    return false;
                }
            }
        };

        self.api.set_token(Some(token.clone()));
        self.persist_credential(&token, username);
        self.log_event(&format!("logged in as {username}"));

        self.start_auto_refresh().await;
        self.populate_in_background();
        true
    }

    /// Forget the credential, stop the auto-refresh timer, every poller and
    /// any initial fetch still in flight.
    pub async fn logout(&self) {
        self.api.set_token(None);
        {
            let mut state = self.state.write().await;
            state.logged_in = false;
            state.username.clear();
            state.login_error.clear();
        }
        for key in [KEY_AUTH_TOKEN, KEY_USERNAME] {
            if let Err(err) = self.store.remove(key) {
                self.log_failure("Error clearing stored credential", &err);
            }
        }
        self.stop_auto_refresh();
        self.cancel_pollers();
        self.log_event("logged out");
        self.cancel_initial_fetches();
    }

    /// Resume with a stored credential, trusted as-is until the server rejects it.
    pub async fn restore_session(self: &Arc<Self>) -> bool {
        let (Some(token), Some(username)) = (
            self.store.get(KEY_AUTH_TOKEN),
            self.store.get(KEY_USERNAME),
        ) else {
            return false;
        };
        if token.is_empty() || username.is_empty() {
            return false;
        }

        self.api.set_token(Some(token));
        {
            let mut state = self.state.write().await;
            state.logged_in = true;
            state.username = username.clone();
        }
        self.log_event(&format!("restored session for {username}"));

        self.start_auto_refresh().await;
        self.populate_in_background();
        true
    }

    fn persist_credential(&self, token: &str, username: &str) {
        for (key, value) in [(KEY_AUTH_TOKEN, token), (KEY_USERNAME, username)] {
            if let Err(err) = self.store.set(key, value) {
                self.log_failure("Error storing credential", &err);
            }
        }
    }

    /// Log a failed call. A rejected credential ends the login so the user
    /// is asked to sign in again instead of seeing a silently stale view.
    pub(crate) async fn handle_failure(&self, context: &str, err: &DashboardError) {
        self.log_failure(context, err);
        if !matches!(err, DashboardError::Unauthorized) {
            return;
        }
        let was_logged_in = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut state.logged_in, false)
        };
        if was_logged_in {
            // logout may abort the task running this
            self.notify(Notification::warning(
                "Session Expired",
                "The server rejected the stored credential. Please log in again.",
            ))
            .await;
            self.logout().await;
        }
    }
}
