use tracing::{error, info};
use uuid::Uuid;

use crate::errors::BuildError;
use crate::models::BuildReport;

/// Build metrics logger
///
/// Emits one structured event per finished build so fragment failure rates
/// can be followed from the logs.
#[derive(Clone, Default)]
pub struct BuildMetricsLogger {}

impl BuildMetricsLogger {
    pub fn new() -> Self {
        Self {}
    }

    /// Log a published build
    pub fn log_build_completed(&self, report: &BuildReport) {
        info!(
            build_id = %report.build_id,
            artists = report.artists,
            degraded_artists = report.degraded_artists,
            locations_failed = report.fragment_failures.locations,
            concert_dates_failed = report.fragment_failures.concert_dates,
            relations_failed = report.fragment_failures.relations,
            duration_ms = report.duration_ms,
            "Snapshot build completed"
        );
    }

    /// Log a build that did not produce a snapshot
    pub fn log_build_failed(&self, build_id: Uuid, error: &BuildError) {
        error!(
            build_id = %build_id,
            error = %error,
            "Snapshot build failed"
        );
    }
}
