use std::io;

use thiserror::Error;

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// The request never produced a response (connection refused, DNS, reset...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with something that is not the expected JSON envelope.
    #[error("unexpected response from server: {0}")]
    Decode(String),
    /// The envelope parsed but carried `success: false`.
    #[error("{}", rejection_text(.message, .status))]
    Rejected { message: Option<String>, status: u16 },
    #[error("not authorized; the stored credential was rejected")]
    Unauthorized,
    #[error("invalid automation parameters: {0}")]
    InvalidParams(String),
    #[error("there are no accounts to export")]
    NoAccounts,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn rejection_text(message: &Option<String>, status: &u16) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("request failed with HTTP {status}"),
    }
}

impl DashboardError {
    /// True when the server could not be reached or did not speak the API.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }
}
