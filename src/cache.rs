//! Client-side mirrors of the server's accounts, proxies and sessions.
//!
//! Each mirror is replaced wholesale by a successful fetch and left alone by
//! a failed one. Writes never touch the mirror directly; they re-fetch.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::chart;
use crate::dashboard::Dashboard;
use crate::errors::DashboardResult;
use crate::models::{Account, Session, SessionStatus};
use crate::notify::Notification;

#[derive(Default)]
pub struct EntityCache {
    pub(crate) accounts: RwLock<Vec<Account>>,
    pub(crate) proxies: RwLock<Vec<String>>,
    pub(crate) sessions: RwLock<Vec<Session>>,
}

/// Newest first.
pub fn sort_sessions(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl Dashboard {
    pub async fn accounts(&self) -> Vec<Account> {
        self.cache.accounts.read().await.clone()
    }

    pub async fn proxies(&self) -> Vec<String> {
        self.cache.proxies.read().await.clone()
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.cache.sessions.read().await.clone()
    }

    /// Replace the sessions mirror, promote a running session to active and
    /// feed the chart.
    pub async fn refresh_sessions(&self) {
        let mut sessions = match self.api.sessions().await {
            Ok(sessions) => sessions,
            Err(err) => {
                self.handle_failure("Error refreshing sessions", &err).await;
                return;
            }
        };
        sort_sessions(&mut sessions);

        let running = sessions
            .iter()
            .find(|s| s.status == SessionStatus::Running)
            .cloned();
        let series = chart::accounts_per_day(&sessions);

        *self.cache.sessions.write().await = sessions;
        if let Some(running) = running {
            self.state.write().await.active_session = Some(running);
        }
        self.chart.update(&series);
    }

    pub async fn refresh_accounts(&self) {
        match self.api.accounts().await {
            Ok(accounts) => *self.cache.accounts.write().await = accounts,
            Err(err) => self.handle_failure("Error refreshing accounts", &err).await,
        }
    }

    pub async fn refresh_proxies(&self) {
        match self.api.proxies().await {
            Ok(proxies) => *self.cache.proxies.write().await = proxies,
            Err(err) => self.handle_failure("Error refreshing proxies", &err).await,
        }
    }

    /// Populate all three mirrors concurrently.
    pub async fn refresh_all(&self) {
        tokio::join!(
            self.refresh_sessions(),
            self.refresh_accounts(),
            self.refresh_proxies()
        );
    }

    /// Populate the three mirrors as independent tasks so a hung read only
    /// holds back its own collection.
    pub fn populate_in_background(self: &Arc<Self>) {
        let sessions = {
            let this = self.clone();
            tokio::spawn(async move { this.refresh_sessions().await })
        };
        let accounts = {
            let this = self.clone();
            tokio::spawn(async move { this.refresh_accounts().await })
        };
        let proxies = {
            let this = self.clone();
            tokio::spawn(async move { this.refresh_proxies().await })
        };

        let mut fetches = self.initial_fetches.lock().unwrap_or_else(|e| e.into_inner());
        fetches.retain(|h| !h.is_finished());
        fetches.extend([sessions, accounts, proxies]);
    }

    /// Whether an initial population started by login is still running.
    pub fn is_populating(&self) -> bool {
        self.initial_fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|h| !h.is_finished())
    }

    pub fn cancel_initial_fetches(&self) {
        let mut fetches = self.initial_fetches.lock().unwrap_or_else(|e| e.into_inner());
        for handle in fetches.drain(..) {
            handle.abort();
        }
    }

    pub async fn add_proxy(&self, proxy: &str) -> DashboardResult<()> {
        let proxy = proxy.trim();
        if proxy.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.api.add_proxy(proxy).await {
            self.handle_failure("Error adding proxy", &err).await;
            return Err(err);
        }
        self.log_event(&format!("proxy added: {proxy}"));
        self.refresh_proxies().await;
        Ok(())
    }

    /// Remove a proxy given either its value or its 1-based position in the mirror.
    pub async fn remove_proxy(&self, target: &str) -> DashboardResult<()> {
        let target = target.trim();
        if target.is_empty() {
            return Ok(());
        }
        let proxy = self.resolve_proxy(target).await;
        if let Err(err) = self.api.remove_proxy(&proxy).await {
            self.handle_failure("Error removing proxy", &err).await;
            return Err(err);
        }
        self.log_event(&format!("proxy removed: {proxy}"));
        self.refresh_proxies().await;
        Ok(())
    }

    async fn resolve_proxy(&self, target: &str) -> String {
        let proxies = self.cache.proxies.read().await;
        target
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| proxies.get(i))
            .cloned()
            .unwrap_or_else(|| target.to_string())
    }

    pub async fn add_user(&self, username: &str, password: &str) -> DashboardResult<()> {
        if username.is_empty() || password.is_empty() {
            return Ok(());
        }
        match self.api.add_user(username, password).await {
            Ok(()) => {
                self.log_event(&format!("user added: {username}"));
                self.notify(Notification::success(
                    "User Added",
                    "New user has been created successfully.",
                ))
                .await;
                Ok(())
            }
            Err(err) => {
                self.handle_failure("Error adding user", &err).await;
                self.notify(Notification::error("Error", "Failed to add user."))
                    .await;
                Err(err)
            }
        }
    }
}
