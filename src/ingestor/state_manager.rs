use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::*;

/// Tracks the progress of snapshot builds, keyed by build id
///
/// Entries are polled through `/api/v1/progress`; finished ones are pruned
/// by [`cleanup_completed`](Self::cleanup_completed).
#[derive(Clone)]
pub struct BuildStateManager {
    states: Arc<RwLock<HashMap<Uuid, BuildProgress>>>,
}

impl BuildStateManager {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn start_build(&self, build_id: Uuid) {
        let now = Utc::now();
        let progress = BuildProgress {
            build_id,
            state: BuildState::Listing,
            progress: ProgressInfo {
                current_step: "Fetching artist listing".to_string(),
                percentage: Some(0.0),
                ..Default::default()
            },
            started_at: now,
            updated_at: now,
            completed_at: None,
            error: None,
        };

        let mut states = self.states.write().await;
        states.insert(build_id, progress);
    }

    pub async fn update_progress(
        &self,
        build_id: Uuid,
        state: BuildState,
        progress_info: ProgressInfo,
    ) {
        let mut states = self.states.write().await;
        if let Some(progress) = states.get_mut(&build_id) {
            let now = Utc::now();
            if matches!(state, BuildState::Completed | BuildState::Error) {
                progress.completed_at = Some(now);
            }
            progress.state = state;
            progress.progress = progress_info;
            progress.updated_at = now;
        }
    }

    /// Report joining progress for a build with `total` artists
    pub async fn report_joined(
        &self,
        build_id: Uuid,
        joined: usize,
        total: usize,
        failures: usize,
    ) {
        let percentage = if total == 0 {
            100.0
        } else {
            joined as f64 / total as f64 * 100.0
        };

        self.update_progress(
            build_id,
            BuildState::Joining,
            ProgressInfo {
                current_step: format!("Joined {}/{} artists", joined, total),
                artists_total: Some(total),
                artists_joined: Some(joined),
                fragment_failures: Some(failures),
                percentage: Some(percentage),
            },
        )
        .await;
    }

    pub async fn set_error(&self, build_id: Uuid, error: String) {
        let mut states = self.states.write().await;
        if let Some(progress) = states.get_mut(&build_id) {
            let now = Utc::now();
            progress.state = BuildState::Error;
            progress.error = Some(error);
            progress.updated_at = now;
            progress.completed_at = Some(now);
        }
    }

    pub async fn complete_build(&self, build_id: Uuid, report: &BuildReport) {
        self.update_progress(
            build_id,
            BuildState::Completed,
            ProgressInfo {
                current_step: format!("Completed - {} artists published", report.artists),
                artists_total: Some(report.artists),
                artists_joined: Some(report.artists),
                fragment_failures: Some(report.fragment_failures.total()),
                percentage: Some(100.0),
            },
        )
        .await;
    }

    pub async fn get_progress(&self, build_id: Uuid) -> Option<BuildProgress> {
        let states = self.states.read().await;
        states.get(&build_id).cloned()
    }

    pub async fn get_all_progress(&self) -> HashMap<Uuid, BuildProgress> {
        let states = self.states.read().await;
        states.clone()
    }

    pub async fn cleanup_completed(&self, max_age_hours: i64) {
        let cutoff = Utc::now() - chrono::Duration::hours(max_age_hours);

        let mut states = self.states.write().await;
        states.retain(|_, progress| {
            match progress.completed_at {
                Some(completed_at) => completed_at > cutoff,
                None => true, // Keep in-progress builds
            }
        });
    }
}

impl Default for BuildStateManager {
    fn default() -> Self {
        Self::new()
    }
}
