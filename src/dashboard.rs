//! The dashboard context: one object owning the caches, the view state,
//! the auto-refresh timer and the per-session pollers.
//!
//! Operations are split by concern across `auth`, `cache` and `poller`,
//! each adding an `impl Dashboard` block; this file holds construction,
//! preferences, the launcher, stats and exports.

use chrono::{Local, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::api::ApiClient;
use crate::cache::EntityCache;
use crate::chart::ChartSink;
use crate::config::AppConfig;
use crate::errors::{DashboardError, DashboardResult};
use crate::export;
use crate::logger::Logger;
use crate::models::{AutomationParams, Session};
use crate::notify::{Notification, Notifier};
use crate::prefs::{KeyValueStore, Preferences, RootElement, DARK_MODE_CLASS};
use crate::stats::{self, DashboardStats};

/// Mutable view state shared by the REPL and background tasks.
#[derive(Debug, Default)]
pub(crate) struct ViewState {
    pub logged_in: bool,
    pub logging_in: bool,
    pub username: String,
    pub login_error: String,
    pub prefs: Preferences,
    pub root: RootElement,
    pub active_session: Option<Session>,
    pub selected_session: Option<Session>,
}

pub struct Dashboard {
    pub(crate) config: AppConfig,
    pub(crate) api: ApiClient,
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) chart: Arc<dyn ChartSink>,
    pub(crate) logger: Arc<Logger>,
    pub(crate) cache: EntityCache,
    pub(crate) state: RwLock<ViewState>,
    auto_refresh: Mutex<Option<JoinHandle<()>>>,
    pub(crate) pollers: Mutex<HashMap<String, JoinHandle<()>>>,
    pub(crate) initial_fetches: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    /// Build the context and apply stored preferences. Nothing is fetched until
    /// `login` or `restore_session`.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        chart: Arc<dyn ChartSink>,
        logger: Arc<Logger>,
    ) -> Arc<Self> {
        let prefs = Preferences::load(store.as_ref());
        let mut root = RootElement::default();
        root.toggle_class(DARK_MODE_CLASS, prefs.dark_mode);

        let api = ApiClient::new(&config, logger.clone());
        Arc::new(Self {
            config,
            api,
            store,
            notifier,
            chart,
            logger,
            cache: EntityCache::default(),
            state: RwLock::new(ViewState {
                prefs,
                root,
                ..ViewState::default()
            }),
            auto_refresh: Mutex::new(None),
            pollers: Mutex::new(HashMap::new()),
            initial_fetches: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // ── Notifications & logging ─────────────────────────────────────────

    /// Deliver `notification` unless the user turned notifications off.
    pub async fn notify(&self, notification: Notification) {
        if self.state.read().await.prefs.notifications_enabled {
            self.notifier.notify(&notification);
        }
    }

    pub(crate) fn log_failure(&self, context: &str, err: &DashboardError) {
        let _ = self.logger.log_error(&format!("{context}: {err}"));
    }

    pub(crate) fn log_event(&self, event: &str) {
        let _ = self.logger.log_event(event);
    }

    // ── Preferences ─────────────────────────────────────────────────────

    pub async fn preferences(&self) -> Preferences {
        self.state.read().await.prefs
    }

    pub async fn root_element(&self) -> RootElement {
        self.state.read().await.root.clone()
    }

    pub async fn set_dark_mode(&self, on: bool) -> DashboardResult<()> {
        let mut state = self.state.write().await;
        state.root.toggle_class(DARK_MODE_CLASS, on);
        state.prefs.set_dark_mode(self.store.as_ref(), on)
    }

    pub async fn set_notifications(&self, on: bool) -> DashboardResult<()> {
        let mut state = self.state.write().await;
        state.prefs.set_notifications(self.store.as_ref(), on)
    }

    /// Persist a new interval and restart the auto-refresh timer with it.
    /// Returns false when `secs` is rejected.
    pub async fn set_refresh_interval(self: &Arc<Self>, secs: u64) -> DashboardResult<bool> {
        let (accepted, logged_in) = {
            let mut state = self.state.write().await;
            let accepted = state
                .prefs
                .set_refresh_interval(self.store.as_ref(), secs)?;
            (accepted, state.logged_in)
        };
        if accepted && logged_in {
            self.start_auto_refresh().await;
        }
        Ok(accepted)
    }

    // ── Auto-refresh ────────────────────────────────────────────────────

    /// (Re)start the background timer: sessions every tick, accounts on a
    /// random subset of ticks.
    pub async fn start_auto_refresh(self: &Arc<Self>) {
        self.stop_auto_refresh();

        let period = Duration::from_secs(self.state.read().await.prefs.refresh_interval_secs);
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(this) = weak.upgrade() else { break };
                if !this.is_logged_in().await {
                    continue;
                }
                this.refresh_sessions().await;
                if rand::random::<f64>() < this.config.accounts_refresh_probability {
                    this.refresh_accounts().await;
                }
            }
        });

        let mut slot = self.auto_refresh.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    pub fn stop_auto_refresh(&self) {
        let mut slot = self.auto_refresh.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.auto_refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Cancel every background task. Called when the shell exits.
    pub fn shutdown(&self) {
        self.stop_auto_refresh();
        self.cancel_pollers();
        self.cancel_initial_fetches();
    }

    // ── Automation launcher ─────────────────────────────────────────────

    /// Launch a session, load its detail as the active session and start polling it.
    pub async fn start_automation(
        self: &Arc<Self>,
        params: &AutomationParams,
    ) -> DashboardResult<String> {
        params.validate()?;
        match self.api.start_automation(params).await {
            Ok(session_id) => {
                self.log_event(&format!("automation started: {session_id}"));
                self.load_session(&session_id, true).await;
                self.spawn_poller(session_id.clone());
                self.notify(Notification::info(
                    "Automation Started",
                    "The automation process has started.",
                ))
                .await;
                Ok(session_id)
            }
            Err(err) => {
                self.handle_failure("Error starting automation", &err).await;
                if err.is_connectivity() {
                    self.notify(Notification::error("Error", "Failed to start automation."))
                        .await;
                }
                Err(err)
            }
        }
    }

    // ── Derived values ──────────────────────────────────────────────────

    pub async fn success_rate(&self) -> u32 {
        stats::success_rate(&self.cache.sessions.read().await)
    }

    pub async fn sessions_today(&self) -> usize {
        stats::sessions_today(&self.cache.sessions.read().await, Local::now())
    }

    pub async fn is_automation_running(&self) -> bool {
        stats::is_automation_running(self.state.read().await.active_session.as_ref())
    }

    pub async fn stats(&self) -> DashboardStats {
        let automation_running = self.is_automation_running().await;
        let total_accounts = self.cache.accounts.read().await.len();
        let proxy_count = self.cache.proxies.read().await.len();
        let sessions = self.cache.sessions.read().await;
        DashboardStats {
            total_sessions: sessions.len(),
            total_accounts,
            proxy_count,
            success_rate: stats::success_rate(&sessions),
            sessions_today: stats::sessions_today(&sessions, Local::now()),
            automation_running,
        }
    }

    pub async fn active_session(&self) -> Option<Session> {
        self.state.read().await.active_session.clone()
    }

    pub async fn selected_session(&self) -> Option<Session> {
        self.state.read().await.selected_session.clone()
    }

    /// Select a session for the detail view by id or id prefix, fetching it when
    /// it is not cached.
    pub async fn select_session(&self, id: &str) -> Option<Session> {
        let cached = {
            let sessions = self.cache.sessions.read().await;
            sessions
                .iter()
                .find(|s| s.id == id)
                .or_else(|| sessions.iter().find(|s| s.id.starts_with(id)))
                .cloned()
        };
        let session = match cached {
            Some(session) => Some(session),
            None => match self.api.session(id).await {
                Ok(session) => Some(session),
                Err(err) => {
                    self.handle_failure("Error getting session details", &err).await;
                    None
                }
            },
        };
        if session.is_some() {
            self.state.write().await.selected_session = session.clone();
        }
        session
    }

    // ── Export ──────────────────────────────────────────────────────────

    /// Write every cached account to `turbolearn_accounts_<date>.csv`.
    /// An empty cache produces a warning notification and no file.
    pub async fn export_accounts(&self) -> DashboardResult<PathBuf> {
        let accounts = self.cache.accounts.read().await.clone();
        if accounts.is_empty() {
            self.notify(Notification::warning(
                "No Accounts",
                "There are no accounts to export",
            ))
            .await;
            return Err(DashboardError::NoAccounts);
        }
        let csv = export::accounts_to_csv(&accounts)?;
        let filename = export::accounts_filename(Utc::now().date_naive());
        let path = export::write_export(Path::new(&self.config.export_dir), &filename, &csv)?;
        self.log_event(&format!("exported {} accounts to {}", accounts.len(), path.display()));
        Ok(path)
    }

    /// Write one session's accounts. Silently does nothing when the session is
    /// unknown or produced no accounts.
    pub async fn export_session_accounts(&self, id: Option<&str>) -> DashboardResult<Option<PathBuf>> {
        let session = match id {
            Some(id) => self.select_session(id).await,
            None => self.selected_session().await,
        };
        let Some(session) = session else {
            return Ok(None);
        };
        if session.accounts().is_empty() {
            return Ok(None);
        }
        let csv = export::accounts_to_csv(session.accounts())?;
        let filename = export::session_filename(&session);
        let path = export::write_export(Path::new(&self.config.export_dir), &filename, &csv)?;
        self.log_event(&format!("exported session {} to {}", session.id, path.display()));
        Ok(Some(path))
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}
