use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cron::Schedule;
use std::str::FromStr;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, trace};

use crate::cache::SnapshotCache;
use crate::config::CacheConfig;

/// Finished builds older than this are dropped from progress tracking
const PROGRESS_RETENTION_HOURS: i64 = 24;

/// Background rebuilds of the snapshot cache
///
/// While no snapshot is published the build is retried every
/// `startup_retry`. Once the cache is ready, rebuilds only happen on the
/// optional cron schedule.
pub struct RefreshScheduler {
    cache: SnapshotCache,
    schedule: Option<Schedule>,
    startup_retry: ChronoDuration,
    started_at: DateTime<Utc>,
    last_attempt: Option<DateTime<Utc>>,
    last_cleanup: DateTime<Utc>,
}

impl RefreshScheduler {
    pub fn new(
        cache: SnapshotCache,
        refresh_cron: Option<&str>,
        startup_retry: Duration,
    ) -> Result<Self> {
        let schedule = refresh_cron
            .map(|expression| {
                Schedule::from_str(expression)
                    .with_context(|| format!("Invalid refresh cron expression '{}'", expression))
            })
            .transpose()?;

        let now = Utc::now();
        Ok(Self {
            cache,
            schedule,
            startup_retry: ChronoDuration::from_std(startup_retry)
                .unwrap_or_else(|_| ChronoDuration::seconds(30)),
            started_at: now,
            last_attempt: None,
            last_cleanup: now,
        })
    }

    pub fn from_config(cache: SnapshotCache, config: &CacheConfig) -> Result<Self> {
        Self::new(
            cache,
            config.refresh_cron.as_deref(),
            Duration::from_secs(config.startup_retry_secs),
        )
    }

    /// Mark a build that happened outside the scheduler (e.g. at startup)
    pub fn with_last_attempt(mut self, at: DateTime<Utc>) -> Self {
        self.last_attempt = Some(at);
        self
    }

    pub async fn start(mut self) -> Result<()> {
        info!("Starting refresh scheduler");

        if let Some(next_time) = self.next_scheduled() {
            info!(
                "Next scheduled snapshot rebuild: {}",
                next_time.format("%Y-%m-%d %H:%M:%S UTC")
            );
        } else {
            debug!("No refresh schedule configured; rebuilds only on demand");
        }

        let mut interval = interval(Duration::from_secs(1)); // Check every second

        loop {
            interval.tick().await;
            trace!("Scheduler tick");
            self.tick(Utc::now()).await;
        }
    }

    /// Run one scheduling step; returns whether a rebuild was attempted
    pub async fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if now.signed_duration_since(self.last_cleanup).num_hours() >= 1 {
            self.cache
                .state_manager()
                .cleanup_completed(PROGRESS_RETENTION_HOURS)
                .await;
            self.last_cleanup = now;
        }

        let ready = self.cache.is_ready().await;
        if !self.is_due(now, ready) {
            return false;
        }

        if ready {
            info!("Scheduled snapshot rebuild starting");
        } else {
            info!("No snapshot published yet, retrying build");
        }

        self.last_attempt = Some(now);
        match self.cache.rebuild().await {
            Ok(report) => {
                info!(
                    "Scheduled rebuild published {} artists{}",
                    report.artists,
                    self.next_scheduled()
                        .map(|next| format!(
                            " - Next update: {}",
                            next.format("%Y-%m-%d %H:%M:%S UTC")
                        ))
                        .unwrap_or_default()
                );
            }
            Err(e) => {
                error!("Scheduled snapshot rebuild failed: {}", e);
            }
        }
        true
    }

    fn is_due(&self, now: DateTime<Utc>, ready: bool) -> bool {
        if !ready {
            return match self.last_attempt {
                Some(last) => now.signed_duration_since(last) >= self.startup_retry,
                None => true,
            };
        }

        let anchor = self.last_attempt.unwrap_or(self.started_at);
        match &self.schedule {
            Some(schedule) => schedule
                .after(&anchor)
                .next()
                .is_some_and(|next_time| now >= next_time),
            None => false,
        }
    }

    fn next_scheduled(&self) -> Option<DateTime<Utc>> {
        self.schedule
            .as_ref()
            .and_then(|schedule| schedule.upcoming(Utc).next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{record, ScriptedBuilder};
    use crate::errors::{BuildError, SourceError};
    use crate::ingestor::BuildStateManager;
    use crate::models::CompositeRecord;
    use std::sync::Arc;

    fn cache(results: Vec<Result<Vec<CompositeRecord>, BuildError>>) -> SnapshotCache {
        SnapshotCache::new(
            Arc::new(ScriptedBuilder::new(results)),
            BuildStateManager::new(),
        )
    }

    fn failure() -> BuildError {
        BuildError::Listing(SourceError::timeout("http://api/artists"))
    }

    #[test]
    fn test_invalid_cron_is_rejected() {
        let result = RefreshScheduler::new(cache(vec![]), Some("whenever"), Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_not_ready_cache_retries_after_interval() {
        let cache = cache(vec![
            Err(failure()),
            Ok(vec![record(1, "Queen", &["Freddie Mercury"], 1970, "14-07-1973")]),
        ]);
        let mut scheduler =
            RefreshScheduler::new(cache.clone(), None, Duration::from_secs(30)).unwrap();
        let start = Utc::now();

        assert!(scheduler.tick(start).await);
        assert!(!cache.is_ready().await);

        // too early for another attempt
        assert!(!scheduler.tick(start + ChronoDuration::seconds(10)).await);

        assert!(scheduler.tick(start + ChronoDuration::seconds(30)).await);
        assert!(cache.is_ready().await);
    }

    #[tokio::test]
    async fn test_ready_cache_without_schedule_is_left_alone() {
        let queen = record(1, "Queen", &["Freddie Mercury"], 1970, "14-07-1973");
        let cache = cache(vec![Ok(vec![queen])]);
        cache.rebuild().await.unwrap();

        let mut scheduler = RefreshScheduler::new(cache, None, Duration::from_secs(1)).unwrap();
        assert!(!scheduler.tick(Utc::now() + ChronoDuration::days(7)).await);
    }

    #[tokio::test]
    async fn test_cron_schedule_triggers_rebuild() {
        let cache = cache(vec![
            Ok(vec![record(1, "Queen", &["Freddie Mercury"], 1970, "14-07-1973")]),
            Ok(vec![
                record(1, "Queen", &["Freddie Mercury"], 1970, "14-07-1973"),
                record(2, "Muse", &["Matt Bellamy"], 1994, "05-10-1999"),
            ]),
        ]);
        cache.rebuild().await.unwrap();

        let anchor = Utc::now();
        let mut scheduler =
            RefreshScheduler::new(cache.clone(), Some("0 0 * * * *"), Duration::from_secs(1))
                .unwrap()
                .with_last_attempt(anchor);

        assert!(!scheduler.tick(anchor).await);
        assert!(scheduler.tick(anchor + ChronoDuration::hours(1)).await);
        assert_eq!(cache.get().await.unwrap().len(), 2);
    }
}
