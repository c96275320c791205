use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod artist;
pub mod snapshot;

pub use artist::*;
pub use snapshot::Snapshot;

/// Per-kind count of fragments that could not be fetched or were rejected
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FragmentFailures {
    pub locations: usize,
    pub concert_dates: usize,
    pub relations: usize,
}

impl FragmentFailures {
    pub fn record(&mut self, kind: FragmentKind) {
        match kind {
            FragmentKind::Locations => self.locations += 1,
            FragmentKind::ConcertDates => self.concert_dates += 1,
            FragmentKind::Relations => self.relations += 1,
        }
    }

    pub fn merge(&mut self, other: &FragmentFailures) {
        self.locations += other.locations;
        self.concert_dates += other.concert_dates;
        self.relations += other.relations;
    }

    pub fn total(&self) -> usize {
        self.locations + self.concert_dates + self.relations
    }
}

/// Outcome summary of a successful build
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildReport {
    pub build_id: Uuid,
    pub artists: usize,
    /// Artists with at least one missing fragment
    pub degraded_artists: usize,
    pub fragment_failures: FragmentFailures,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// A freshly built snapshot together with its report
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub snapshot: Snapshot,
    pub report: BuildReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildProgress {
    pub build_id: Uuid,
    pub state: BuildState,
    pub progress: ProgressInfo,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Listing,
    Joining,
    Publishing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub current_step: String,
    pub artists_total: Option<usize>,
    pub artists_joined: Option<usize>,
    pub fragment_failures: Option<usize>,
    pub percentage: Option<f64>,
}

/// Current state of the snapshot cache, as reported to operators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub ready: bool,
    pub artists: usize,
    pub build_id: Option<Uuid>,
    pub built_at: Option<DateTime<Utc>>,
    pub last_report: Option<BuildReport>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}
