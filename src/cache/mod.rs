//! Snapshot cache
//!
//! Owns the published [`Snapshot`] and its build lifecycle.
//!
//! # Publish protocol
//!
//! - Readers clone the current `Arc<Snapshot>` under a short read lock and
//!   never hold the lock across I/O.
//! - A rebuild runs the [`SnapshotBuilder`] without any lock on the published
//!   snapshot, then installs the new `Arc` under the write lock. Readers see
//!   either the old or the new snapshot, never a mix.
//! - A failed or timed-out build leaves the published snapshot untouched.
//! - Rebuilds are serialized; a second caller waits for the first to finish.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{BuildError, CacheError};
use crate::ingestor::{BuildStateManager, SnapshotBuilder};
use crate::metrics::BuildMetricsLogger;
use crate::models::{BuildReport, BuildState, CacheStatus, ProgressInfo, Snapshot};

#[derive(Default)]
struct BuildHistory {
    last_report: Option<BuildReport>,
    last_error: Option<(String, DateTime<Utc>)>,
}

#[derive(Clone)]
pub struct SnapshotCache {
    published: Arc<RwLock<Option<Arc<Snapshot>>>>,
    history: Arc<RwLock<BuildHistory>>,
    rebuild_lock: Arc<Mutex<()>>,
    builder: Arc<dyn SnapshotBuilder>,
    state_manager: BuildStateManager,
    metrics: BuildMetricsLogger,
    build_timeout: Option<Duration>,
}

impl SnapshotCache {
    pub fn new(builder: Arc<dyn SnapshotBuilder>, state_manager: BuildStateManager) -> Self {
        Self {
            published: Arc::new(RwLock::new(None)),
            history: Arc::new(RwLock::new(BuildHistory::default())),
            rebuild_lock: Arc::new(Mutex::new(())),
            builder,
            state_manager,
            metrics: BuildMetricsLogger::new(),
            build_timeout: None,
        }
    }

    pub fn with_build_timeout(mut self, build_timeout: Option<Duration>) -> Self {
        self.build_timeout = build_timeout;
        self
    }

    /// Current snapshot, or `NotReady` until the first build succeeds
    pub async fn get(&self) -> Result<Arc<Snapshot>, CacheError> {
        self.try_get().await.ok_or(CacheError::NotReady)
    }

    pub async fn try_get(&self) -> Option<Arc<Snapshot>> {
        self.published.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        self.published.read().await.is_some()
    }

    pub fn state_manager(&self) -> &BuildStateManager {
        &self.state_manager
    }

    /// Build a new snapshot and publish it on success
    pub async fn rebuild(&self) -> Result<BuildReport, BuildError> {
        let _guard = self.rebuild_lock.lock().await;

        let build_id = Uuid::new_v4();
        info!("Starting snapshot build {}", build_id);
        self.state_manager.start_build(build_id).await;

        let result = match self.build_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.builder.build_snapshot(build_id)).await {
                    Ok(result) => result,
                    // The build future is dropped here, discarding any partial results
                    Err(_) => Err(BuildError::Timeout { limit }),
                }
            }
            None => self.builder.build_snapshot(build_id).await,
        };

        match result {
            Ok(outcome) => {
                self.state_manager
                    .update_progress(
                        build_id,
                        BuildState::Publishing,
                        ProgressInfo {
                            current_step: "Publishing snapshot".to_string(),
                            artists_total: Some(outcome.report.artists),
                            artists_joined: Some(outcome.report.artists),
                            fragment_failures: Some(outcome.report.fragment_failures.total()),
                            percentage: Some(100.0),
                        },
                    )
                    .await;

                let report = outcome.report;
                let snapshot = Arc::new(outcome.snapshot);
                {
                    let mut published = self.published.write().await;
                    *published = Some(snapshot);
                }
                {
                    let mut history = self.history.write().await;
                    history.last_report = Some(report.clone());
                }

                self.state_manager.complete_build(build_id, &report).await;
                self.metrics.log_build_completed(&report);
                Ok(report)
            }
            Err(e) => {
                if self.is_ready().await {
                    warn!("Keeping previously published snapshot after failed build {}", build_id);
                }
                {
                    let mut history = self.history.write().await;
                    history.last_error = Some((e.to_string(), Utc::now()));
                }

                self.state_manager.set_error(build_id, e.to_string()).await;
                self.metrics.log_build_failed(build_id, &e);
                Err(e)
            }
        }
    }

    pub async fn status(&self) -> CacheStatus {
        let snapshot = self.try_get().await;
        let history = self.history.read().await;

        CacheStatus {
            ready: snapshot.is_some(),
            artists: snapshot.as_ref().map(|s| s.len()).unwrap_or(0),
            build_id: snapshot.as_ref().map(|s| s.build_id),
            built_at: snapshot.as_ref().map(|s| s.built_at),
            last_report: history.last_report.clone(),
            last_error: history.last_error.as_ref().map(|(message, _)| message.clone()),
            last_error_at: history.last_error.as_ref().map(|(_, at)| *at),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    pub fn record(
        id: u32,
        name: &str,
        members: &[&str],
        creation_date: i32,
        first_album: &str,
    ) -> CompositeRecord {
        CompositeRecord {
            artist: ArtistSummary {
                id,
                name: name.to_string(),
                image: String::new(),
                members: members.iter().map(|m| m.to_string()).collect(),
                creation_date,
                first_album: first_album.to_string(),
                locations: String::new(),
                concert_dates: String::new(),
                relations: String::new(),
            },
            locations: LocationsFragment::empty_for(id),
            concert_dates: ConcertDatesFragment::empty_for(id),
            relations: RelationsFragment::empty_for(id),
        }
    }

    /// Builder that replays a queue of canned results
    pub struct ScriptedBuilder {
        results: Mutex<VecDeque<Result<Vec<CompositeRecord>, BuildError>>>,
        delay: Option<Duration>,
    }

    impl ScriptedBuilder {
        pub fn new(results: Vec<Result<Vec<CompositeRecord>, BuildError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                delay: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl SnapshotBuilder for ScriptedBuilder {
        async fn build_snapshot(&self, build_id: Uuid) -> Result<BuildOutcome, BuildError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let next = self
                .results
                .lock()
                .await
                .pop_front()
                .expect("scripted builder exhausted");
            let records = next?;
            let now = Utc::now();

            Ok(BuildOutcome {
                report: BuildReport {
                    build_id,
                    artists: records.len(),
                    degraded_artists: 0,
                    fragment_failures: FragmentFailures::default(),
                    started_at: now,
                    completed_at: now,
                    duration_ms: 0,
                },
                snapshot: Snapshot::new(build_id, records),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::errors::SourceError;
    use tokio_test::{assert_err, assert_ok};

    fn listing_failure() -> BuildError {
        BuildError::Listing(SourceError::http("http://api/artists", 500))
    }

    fn cache(builder: ScriptedBuilder) -> SnapshotCache {
        SnapshotCache::new(Arc::new(builder), BuildStateManager::new())
    }

    #[tokio::test]
    async fn test_reads_fail_fast_before_first_build() {
        let cache = cache(ScriptedBuilder::new(vec![]));

        assert_eq!(cache.get().await.unwrap_err(), CacheError::NotReady);
        assert!(!cache.is_ready().await);
        assert!(!cache.status().await.ready);
    }

    #[tokio::test]
    async fn test_successful_build_is_published() {
        let cache = cache(ScriptedBuilder::new(vec![Ok(vec![
            record(1, "Queen", &["Freddie Mercury"], 1970, "14-07-1973"),
            record(2, "Gorillaz", &["Damon Albarn"], 1998, "26-03-2001"),
        ])]));

        let report = assert_ok!(cache.rebuild().await);
        assert_eq!(report.artists, 2);

        let snapshot = assert_ok!(cache.get().await);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.build_id, report.build_id);

        let progress = cache.state_manager().get_progress(report.build_id).await.unwrap();
        assert_eq!(progress.state, BuildState::Completed);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_snapshot() {
        let cache = cache(ScriptedBuilder::new(vec![
            Ok(vec![record(1, "Queen", &["Freddie Mercury"], 1970, "14-07-1973")]),
            Err(listing_failure()),
        ]));

        assert_ok!(cache.rebuild().await);
        let before = cache.get().await.unwrap();

        let err = assert_err!(cache.rebuild().await);
        assert_eq!(err, listing_failure());

        let after = cache.get().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));

        let status = cache.status().await;
        assert!(status.ready);
        assert_eq!(status.artists, 1);
        assert!(status.last_error.unwrap().contains("Artist listing unavailable"));
        assert!(status.last_error_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_first_build_stays_not_ready() {
        let cache = cache(ScriptedBuilder::new(vec![Err(listing_failure())]));

        assert_err!(cache.rebuild().await);
        assert_eq!(cache.get().await.unwrap_err(), CacheError::NotReady);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_snapshot_wholesale() {
        let cache = cache(ScriptedBuilder::new(vec![
            Ok(vec![record(1, "Queen", &["Freddie Mercury"], 1970, "14-07-1973")]),
            Ok(vec![
                record(2, "Gorillaz", &["Damon Albarn"], 1998, "26-03-2001"),
                record(3, "Muse", &["Matt Bellamy"], 1994, "05-10-1999"),
            ]),
        ]));

        assert_ok!(cache.rebuild().await);
        let first = cache.get().await.unwrap();
        assert_ok!(cache.rebuild().await);
        let second = cache.get().await.unwrap();

        // Old readers keep their snapshot intact
        assert_eq!(first.len(), 1);
        assert!(first.by_id(1).is_some());
        assert_eq!(second.len(), 2);
        assert!(second.by_id(1).is_none());
    }

    #[tokio::test]
    async fn test_timed_out_build_is_discarded() {
        let builder = ScriptedBuilder::new(vec![Ok(vec![record(
            1,
            "Queen",
            &["Freddie Mercury"],
            1970,
            "14-07-1973",
        )])])
        .with_delay(Duration::from_millis(200));
        let cache = cache(builder).with_build_timeout(Some(Duration::from_millis(10)));

        let err = assert_err!(cache.rebuild().await);
        assert_eq!(
            err,
            BuildError::Timeout {
                limit: Duration::from_millis(10)
            }
        );
        assert!(cache.status().await.last_error.unwrap().ends_with("10ms"));
        assert!(!cache.is_ready().await);
    }

    #[tokio::test]
    async fn test_concurrent_rebuilds_are_serialized() {
        let builder = ScriptedBuilder::new(vec![
            Ok(vec![record(1, "Queen", &["Freddie Mercury"], 1970, "14-07-1973")]),
            Ok(vec![record(2, "Gorillaz", &["Damon Albarn"], 1998, "26-03-2001")]),
        ])
        .with_delay(Duration::from_millis(20));
        let cache = cache(builder);

        let (first, second) = tokio::join!(cache.rebuild(), cache.rebuild());
        assert_ok!(first);
        assert_ok!(second);

        let all = cache.state_manager().get_all_progress().await;
        assert_eq!(all.len(), 2);
        assert!(all.values().all(|p| p.state == BuildState::Completed));
    }
}
