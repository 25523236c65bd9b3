use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::utils::{ensure_dir, find_char_boundary};

/// Append-only session log. One file per run, one timestamped line per event.
pub struct Logger {
    log_file: PathBuf,
}

impl Logger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(log_dir);
        ensure_dir(&dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_file = dir.join(format!("session_{}.log", timestamp));

        Ok(Self { log_file })
    }

    pub fn path(&self) -> &Path {
        &self.log_file
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, message)?;
        Ok(())
    }

    pub fn log_request(&self, method: &str, path: &str) -> Result<()> {
        self.log(&format!("REQUEST {} {}", method, path))
    }

    pub fn log_response(&self, path: &str, body: &str) -> Result<()> {
        let preview = if body.len() > 200 {
            format!("{}...", &body[..find_char_boundary(body, 200)])
        } else {
            body.to_string()
        };
        self.log(&format!("RESPONSE {}: {}", path, preview))
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(&format!("EVENT: {}", event))
    }

    pub fn log_error(&self, error: &str) -> Result<()> {
        self.log(&format!("ERROR: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_logger_creation() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("nested_logs");
        let logger = Logger::new(log_dir.to_str().unwrap()).unwrap();
        assert!(logger.path().parent().unwrap().exists());
        assert!(logger
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("session_"));
    }

    #[test]
    fn test_logger_multiple_entries() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(dir.path().to_str().unwrap()).unwrap();

        logger.log_request("GET", "/api/sessions").unwrap();
        logger.log_event("login succeeded").unwrap();
        logger.log_error("Error refreshing accounts").unwrap();

        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("REQUEST GET /api/sessions"));
        assert!(content.contains("EVENT: login succeeded"));
        assert!(content.contains("ERROR: Error refreshing accounts"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_response_preview_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(dir.path().to_str().unwrap()).unwrap();

        let body = "é".repeat(300);
        logger.log_response("/api/accounts", &body).unwrap();

        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.trim_end().ends_with("..."));
        assert!(content.len() < body.len());
    }
}
