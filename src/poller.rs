//! Per-session status polling.
//!
//! Each launched session gets its own task, keyed by session id, that
//! re-fetches the session on a fixed period until it reaches a terminal
//! state. Pollers are cancelled individually (re-launch of the same id),
//! on terminal state (the task returns) or all at once on logout.

use std::sync::Arc;

use crate::dashboard::Dashboard;
use crate::models::{Session, SessionStatus};
use crate::notify::Notification;

impl Dashboard {
    /// Fetch a session's detail. With `make_active` it always becomes the
    /// active session; otherwise it only refreshes the active session when
    /// that is the same id (or none is set).
    pub async fn load_session(&self, id: &str, make_active: bool) -> Option<Session> {
        let session = match self.api.session(id).await {
            Ok(session) => session,
            Err(err) => {
                self.handle_failure("Error getting session details", &err).await;
                return None;
            }
        };

        let mut state = self.state.write().await;
        let replace = make_active
            || state
                .active_session
                .as_ref()
                .map_or(true, |active| active.id == session.id);
        if replace {
            state.active_session = Some(session.clone());
        }
        if state
            .selected_session
            .as_ref()
            .is_some_and(|selected| selected.id == session.id)
        {
            state.selected_session = Some(session.clone());
        }
        Some(session)
    }

    /// Start polling `session_id`, replacing any poller already tracking it.
    pub fn spawn_poller(self: &Arc<Self>, session_id: String) {
        let weak = Arc::downgrade(self);
        let period = self.config.poll_interval();
        let id = session_id.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let Some(this) = weak.upgrade() else { return };
                let Some(session) = this.load_session(&id, false).await else {
                    continue;
                };
                if session.status.is_terminal() {
                    this.finish_polling(&session).await;
                    return;
                }
            }
        });

        let mut pollers = self.pollers.lock().unwrap_or_else(|e| e.into_inner());
        pollers.retain(|_, h| !h.is_finished());
        if let Some(previous) = pollers.insert(session_id, handle) {
            previous.abort();
        }
    }

    async fn finish_polling(&self, session: &Session) {
        let completed = session.status == SessionStatus::Completed;
        self.log_event(&format!("session {} finished: {}", session.id, session.status));

        self.refresh_sessions().await;
        if completed {
            self.refresh_accounts().await;
        }

        let notification = if completed {
            Notification::success(
                "Automation Completed",
                "Account creation completed successfully.",
            )
        } else {
            Notification::error("Automation Failed", "There was an error during automation.")
        };
        self.notify(notification).await;
    }

    /// Ids of sessions still being polled.
    pub fn active_pollers(&self) -> Vec<String> {
        let pollers = self.pollers.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = pollers
            .iter()
            .filter(|(_, h)| !h.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn cancel_pollers(&self) {
        let mut pollers = self.pollers.lock().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in pollers.drain() {
            handle.abort();
        }
    }
}
