use chrono::{DateTime, Local, TimeZone};

use crate::models::{Session, SessionStatus};

/// Percentage of sessions that completed, rounded half away from zero. 0 with no sessions.
pub fn success_rate(sessions: &[Session]) -> u32 {
    if sessions.is_empty() {
        return 0;
    }
    let completed = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .count();
    (100.0 * completed as f64 / sessions.len() as f64).round() as u32
}

/// Local midnight at the start of `now`'s calendar day.
pub fn local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        // midnight skipped by a DST jump
        .unwrap_or(now)
}

/// Sessions created at or after local midnight of `now`.
pub fn sessions_today(sessions: &[Session], now: DateTime<Local>) -> usize {
    let midnight = local_midnight(now);
    sessions.iter().filter(|s| s.created_at >= midnight).count()
}

pub fn is_automation_running(active: Option<&Session>) -> bool {
    active.is_some_and(|s| s.status == SessionStatus::Running)
}

/// Snapshot of the summary cards.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_sessions: usize,
    pub total_accounts: usize,
    pub proxy_count: usize,
    pub success_rate: u32,
    pub sessions_today: usize,
    pub automation_running: bool,
}
