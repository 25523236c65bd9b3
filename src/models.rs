use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{DashboardError, DashboardResult};

// ── Sessions ────────────────────────────────────────────────────────────

/// Lifecycle state of a server-side automation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Initializing,
    Running,
    Completed,
    Failed,
    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    /// `completed` and `failed` never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log line the server attaches to a running session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    #[serde(default)]
    pub timestamp: String,
    pub message: String,
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Read-only mirror of a server-side automation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Local>,
    #[serde(default)]
    pub result: Option<Vec<Account>>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub logs: Vec<SessionLog>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub completed_at: Option<DateTime<Local>>,
}

impl Session {
    /// Accounts produced by this session, empty while none exist.
    pub fn accounts(&self) -> &[Account] {
        self.result.as_deref().unwrap_or(&[])
    }

    /// First eight characters of the id, used in listings and export filenames.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((end, _)) => &self.id[..end],
            None => &self.id,
        }
    }
}

// ── Accounts ────────────────────────────────────────────────────────────

/// A credential provisioned by a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Local>>,
}

// ── Automation parameters ───────────────────────────────────────────────

/// Launch configuration posted verbatim to `/api/start_automation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationParams {
    pub browser: String,
    pub instances: u32,
    pub headless: bool,
    pub use_random_proxy: bool,
    pub proxy: String,
    pub use_fingerprinting: bool,
    pub enable_error_recovery: bool,
}

impl Default for AutomationParams {
    fn default() -> Self {
        Self {
            browser: "chrome".to_string(),
            instances: 1,
            headless: false,
            use_random_proxy: false,
            proxy: String::new(),
            use_fingerprinting: true,
            enable_error_recovery: true,
        }
    }
}

impl AutomationParams {
    pub fn validate(&self) -> DashboardResult<()> {
        if self.instances < 1 {
            return Err(DashboardError::InvalidParams(
                "instances must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a single `key=value` override, as typed in the REPL.
    pub fn set(&mut self, key: &str, value: &str) -> DashboardResult<()> {
        let invalid = || DashboardError::InvalidParams(format!("bad value '{value}' for {key}"));
        match key {
            "browser" => self.browser = value.to_string(),
            "instances" => self.instances = value.parse().map_err(|_| invalid())?,
            "headless" => self.headless = parse_flag(value).ok_or_else(invalid)?,
            "random_proxy" | "use_random_proxy" => {
                self.use_random_proxy = parse_flag(value).ok_or_else(invalid)?
            }
            "proxy" => self.proxy = value.to_string(),
            "fingerprinting" | "use_fingerprinting" => {
                self.use_fingerprinting = parse_flag(value).ok_or_else(invalid)?
            }
            "recovery" | "enable_error_recovery" => {
                self.enable_error_recovery = parse_flag(value).ok_or_else(invalid)?
            }
            other => {
                return Err(DashboardError::InvalidParams(format!(
                    "unknown parameter '{other}'"
                )))
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

// ── Timestamps ──────────────────────────────────────────────────────────

/// Server timestamps are ISO-8601; values without an offset are local time.
pub mod timestamp {
    use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Local>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Local));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;
        Local.from_local_datetime(&naive).earliest()
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    /// Lenient variant: missing, null or unparseable values become `None`.
    pub mod option {
        use chrono::{DateTime, Local};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Local>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => s.serialize_str(&dt.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Local>>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            Ok(raw.as_deref().and_then(super::parse))
        }
    }
}
