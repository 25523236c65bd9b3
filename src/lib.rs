use anyhow::Result;
use dotenvy::dotenv;

pub mod api;
pub mod auth;
pub mod cache;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod export;
pub mod interface;
pub mod logger;
pub mod models;
pub mod notify;
pub mod poller;
pub mod prefs;
pub mod stats;
pub mod utils;

/// Run the application: load `.env`, load config, and start the REPL.
pub async fn run() -> Result<()> {
    dotenv().ok();

    let config = config::AppConfig::load();
    interface::start_repl(&config).await;

    Ok(())
}

// Re-exports for library consumers
pub use config::AppConfig;
pub use dashboard::Dashboard;
pub use errors::{DashboardError, DashboardResult};
pub use models::{Account, AutomationParams, Session, SessionStatus};
