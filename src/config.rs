use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides `api_url` (also read from `.env`).
pub const API_URL_ENV: &str = "TURBOLEARN_API_URL";

/// Application configuration, loaded from `turbolearn.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub accounts_refresh_probability: f64,
    /// Per-request timeout; 0 leaves requests unbounded.
    pub request_timeout_secs: u64,
    pub log_dir: String,
    pub export_dir: String,
    /// Where preferences and the stored credential live. Empty means the
    /// platform data directory.
    pub data_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000".to_string(),
            poll_interval_ms: 2000,
            accounts_refresh_probability: 0.3,
            request_timeout_secs: 0,
            log_dir: "logs".to_string(),
            export_dir: ".".to_string(),
            data_dir: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with the chain: `./turbolearn.toml` -> `~/turbolearn.toml` -> defaults,
    /// then apply the `TURBOLEARN_API_URL` override.
    pub fn load() -> Self {
        let mut cfg = Self::load_file();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                cfg.api_url = url.trim().to_string();
            }
        }
        cfg
    }

    fn load_file() -> Self {
        for path in &Self::config_paths() {
            if let Ok(contents) = fs::read_to_string(path) {
                match toml::from_str::<AppConfig>(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("turbolearn.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("turbolearn.toml"));
        }
        paths
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Directory holding `prefs.json`.
    pub fn data_path(&self) -> PathBuf {
        if !self.data_dir.is_empty() {
            return PathBuf::from(&self.data_dir);
        }
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("turbolearn")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.poll_interval_ms, 2000);
        assert_eq!(cfg.accounts_refresh_probability, 0.3);
        assert_eq!(cfg.request_timeout_secs, 0);
        assert_eq!(cfg.log_dir, "logs");
        assert_eq!(cfg.export_dir, ".");
        assert!(cfg.data_dir.is_empty());
        assert!(cfg.request_timeout().is_none());
        assert_eq!(cfg.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_toml_deserialize() {
        let toml_str = r#"
            api_url = "http://dashboard.local:8080"
            poll_interval_ms = 500
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.api_url, "http://dashboard.local:8080");
        assert_eq!(cfg.poll_interval_ms, 500);
        // Other fields should be defaults
        assert_eq!(cfg.accounts_refresh_probability, 0.3);
        assert_eq!(cfg.log_dir, "logs");
    }

    #[test]
    fn test_full_toml_deserialize() {
        let toml_str = r#"
            api_url = "https://example.com"
            poll_interval_ms = 1000
            accounts_refresh_probability = 1.0
            request_timeout_secs = 15
            log_dir = "my_logs"
            export_dir = "exports"
            data_dir = "/tmp/turbolearn"
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.api_url, "https://example.com");
        assert_eq!(cfg.accounts_refresh_probability, 1.0);
        assert_eq!(cfg.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(cfg.export_dir, "exports");
        assert_eq!(cfg.data_path(), PathBuf::from("/tmp/turbolearn"));
    }

    #[test]
    fn test_default_data_path_is_namespaced() {
        let cfg = AppConfig::default();
        assert!(cfg.data_path().ends_with("turbolearn"));
    }
}
