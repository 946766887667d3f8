use chrono::{DateTime, NaiveDate, Utc};

// ── 采集结果 ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Ok,
    TimedOut,
    Unavailable,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Ok => write!(f, "ok"),
            EntryStatus::TimedOut => write!(f, "timed_out"),
            EntryStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// One named, status-tagged unit of gathered data.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEntry {
    pub name: String,
    pub value: String,
    pub status: EntryStatus,
}

impl DiagnosticEntry {
    pub fn ok(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), status: EntryStatus::Ok }
    }

    pub fn timed_out(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), status: EntryStatus::TimedOut }
    }

    pub fn unavailable(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), status: EntryStatus::Unavailable }
    }
}

/// Entries in step declaration order, stamped once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticPayload {
    pub collected_at: DateTime<Utc>,
    pub entries: Vec<DiagnosticEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostSample {
    pub period_start: NaiveDate,
    pub service_name: String,
    pub amount: f64,
}

impl CostSample {
    pub fn new(period_start: NaiveDate, service_name: impl Into<String>, amount: f64) -> Self {
        Self { period_start, service_name: service_name.into(), amount }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostPayload {
    pub collected_at: DateTime<Utc>,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub instance_id: Option<String>,
    pub cpu_utilization_avg: Option<f64>,
    /// Ranked selection handed to the prompt; `sample_count` is the size
    /// of the full set it was drawn from.
    pub top_costs: Vec<CostSample>,
    pub sample_count: usize,
    /// One status entry per API step, in the order they ran.
    pub steps: Vec<DiagnosticEntry>,
}

impl CostPayload {
    pub fn window_days(&self) -> i64 {
        (self.window_end - self.window_start).num_days()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Diagnostics(DiagnosticPayload),
    Cost(CostPayload),
}

// ── 生成与报告 ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Hosted,
    Local,
}

impl BackendKind {
    /// `ollama` selects the local backend, anything else the hosted one.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("ollama") {
            BackendKind::Local
        } else {
            BackendKind::Hosted
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Hosted => write!(f, "hosted chat"),
            BackendKind::Local => write!(f, "local cli"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub body: String,
    pub generated_at: DateTime<Utc>,
    pub backend_used: BackendKind,
}
