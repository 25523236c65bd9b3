use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::models::{Session, SessionStatus};

/// Number of most recent days kept in the chart.
pub const CHART_DAYS: usize = 7;

/// Labeled series handed to a chart sink: "Accounts Created" per day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<usize>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Rendering surface fed with the full series on every sessions refresh.
pub trait ChartSink: Send + Sync {
    fn update(&self, series: &ChartSeries);
}

/// Bucket completed sessions by local calendar day, counting produced accounts,
/// oldest first, limited to the last [`CHART_DAYS`] buckets.
pub fn accounts_per_day(sessions: &[Session]) -> ChartSeries {
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for session in sessions {
        if session.status != SessionStatus::Completed {
            continue;
        }
        if let Some(result) = &session.result {
            *by_day.entry(session.created_at.date_naive()).or_insert(0) += result.len();
        }
    }

    let skip = by_day.len().saturating_sub(CHART_DAYS);
    let mut series = ChartSeries::default();
    for (day, count) in by_day.into_iter().skip(skip) {
        series.labels.push(day.format("%b %-d").to_string());
        series.values.push(count);
    }
    series
}

// ── Sinks ───────────────────────────────────────────────────────────────

/// Keeps the latest series and draws it as horizontal bars on demand.
#[derive(Default)]
pub struct TerminalChart {
    latest: Mutex<ChartSeries>,
}

impl TerminalChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> ChartSeries {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn render(&self, width: usize) -> String {
        let series = self.latest();
        if series.is_empty() {
            return "No completed sessions yet.".to_string();
        }
        let max = series.values.iter().copied().max().unwrap_or(0).max(1);
        let label_width = series.labels.iter().map(|l| l.len()).max().unwrap_or(0);
        series
            .labels
            .iter()
            .zip(&series.values)
            .map(|(label, value)| {
                let bar = "█".repeat(value * width / max);
                format!("{label:>label_width$} │ {bar} {value}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ChartSink for TerminalChart {
    fn update(&self, series: &ChartSeries) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = series.clone();
    }
}

/// Records every update it receives.
#[derive(Default)]
pub struct MemoryChart {
    updates: Mutex<Vec<ChartSeries>>,
}

impl MemoryChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ChartSeries> {
        self.updates.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ChartSink for MemoryChart {
    fn update(&self, series: &ChartSeries) {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(series.clone());
    }
}
