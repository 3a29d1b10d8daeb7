use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a submitted job, as reported by the cluster or
/// inferred from an archive record.
///
/// Jobs move through `None → Pending → Running → Terminating → {Succeeded|Failed}`.
/// `None` stands for "not seen yet" and is equivalent to having no record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    None,
    Pending,
    Running,
    Terminating,
    Succeeded,
    Failed,
}

impl Phase {
    /// Every phase, in lifecycle order.
    pub const ALL: [Phase; 6] = [
        Phase::None,
        Phase::Pending,
        Phase::Running,
        Phase::Terminating,
        Phase::Succeeded,
        Phase::Failed,
    ];

    /// Succeeded or Failed: eligible for archival, never resubmitted.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }

    /// Still occupying the cluster.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Pending | Phase::Running | Phase::Terminating)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::None => "None",
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Terminating => "Terminating",
            Phase::Succeeded => "Succeeded",
            Phase::Failed => "Failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned for phase strings outside the six known phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a given retry attempt using exponential backoff.
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// An item that could not be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub index: usize,
    /// Empty when the failure happened before a job name was known.
    pub name: String,
    pub reason: String,
}

/// Structured record produced when a run finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_items: usize,
    pub submitted: usize,
    /// Items whose job was already terminal (archived or finished) and were not resubmitted.
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
    pub final_counts: BTreeMap<Phase, usize>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunSummary {
    pub fn start(total_items: usize) -> Self {
        let now = Utc::now();
        Self {
            total_items,
            submitted: 0,
            skipped: 0,
            failures: Vec::new(),
            final_counts: BTreeMap::new(),
            started_at: now,
            completed_at: now,
            duration_ms: 0,
        }
    }

    /// Stamp the completion time and the last observed counters.
    pub fn finish(&mut self, final_counts: BTreeMap<Phase, usize>) {
        let now = Utc::now();
        self.completed_at = now;
        self.duration_ms = (now - self.started_at).num_milliseconds();
        self.final_counts = final_counts;
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
