//! Artist aggregation
//!
//! Fetches the artist listing, then the three fragments of every artist, and
//! joins them into [`CompositeRecord`]s. Fragment fetches for one artist run
//! concurrently with each other and with those of other artists, bounded by
//! `max_concurrency`. The output keeps the listing order no matter which
//! fetch finishes first.
//!
//! A failed fragment never drops its artist: the record is produced with an
//! empty fragment and the failure is counted in the [`BuildReport`].

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BuildStateManager, SnapshotBuilder};
use crate::config::Config;
use crate::errors::{BuildError, SourceError, SourceResult};
use crate::models::*;
use crate::sources::{fetch, SourceClient};

/// Why a single fragment was replaced by an empty one
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    #[error("no {kind} URL in artist summary")]
    MissingUrl { kind: FragmentKind },

    #[error("{kind} fetch failed: {source}")]
    Source {
        kind: FragmentKind,
        #[source]
        source: SourceError,
    },

    #[error("{kind} fragment belongs to artist {found}, expected {expected}")]
    Mismatch {
        kind: FragmentKind,
        expected: u32,
        found: u32,
    },
}

/// Bounded retry for fragment fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        attempts: 0,
        backoff: Duration::ZERO,
    };

    /// Exponential backoff with up to 50% random jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.backoff.as_millis() as u64;
        let scaled = base.saturating_mul(1u64 << retry.min(16));
        let jitter = fastrand::u64(0..=scaled / 2);
        Duration::from_millis(scaled.saturating_add(jitter))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}

struct JoinedArtist {
    record: CompositeRecord,
    failures: FragmentFailures,
}

pub struct ArtistAggregator {
    client: Arc<dyn SourceClient>,
    base_url: String,
    max_concurrency: usize,
    retry: RetryPolicy,
    progress_update_interval: usize,
    state_manager: BuildStateManager,
}

impl ArtistAggregator {
    pub fn new(
        client: Arc<dyn SourceClient>,
        base_url: impl Into<String>,
        state_manager: BuildStateManager,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            max_concurrency: 8,
            retry: RetryPolicy::NONE,
            progress_update_interval: 10,
            state_manager,
        }
    }

    pub fn from_config(
        client: Arc<dyn SourceClient>,
        config: &Config,
        state_manager: BuildStateManager,
    ) -> Self {
        Self::new(client, config.source.base_url.clone(), state_manager)
            .with_max_concurrency(config.source.max_concurrent_artists)
            .with_retry(RetryPolicy {
                attempts: config.source.retry_attempts,
                backoff: config.source.retry_backoff(),
            })
            .with_progress_interval(config.cache.progress_update_interval)
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_update_interval = interval.max(1);
        self
    }

    async fn fetch_listing(&self) -> Result<Vec<ArtistSummary>, BuildError> {
        debug!("Fetching artist listing from {}", self.base_url);
        fetch(self.client.as_ref(), &self.base_url)
            .await
            .map_err(BuildError::Listing)
    }

    /// Decode failures are returned at once; the same body would fail again.
    async fn fetch_with_retry<T: DeserializeOwned>(&self, url: &str) -> SourceResult<T> {
        let mut retry = 0;
        loop {
            match fetch(self.client.as_ref(), url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transport() && retry < self.retry.attempts => {
                    let delay = self.retry.delay_for(retry);
                    debug!(
                        "Retrying {} in {:?} (attempt {}/{}): {}",
                        url,
                        delay,
                        retry + 1,
                        self.retry.attempts,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_fragment<F>(&self, artist_id: u32, url: &str) -> Result<F, FragmentError>
    where
        F: Fragment + DeserializeOwned,
    {
        if url.is_empty() {
            return Err(FragmentError::MissingUrl { kind: F::KIND });
        }

        let fragment: F = self
            .fetch_with_retry(url)
            .await
            .map_err(|source| FragmentError::Source {
                kind: F::KIND,
                source,
            })?;

        // A zero id means the source omitted it; trust the URL we followed.
        match fragment.id() {
            0 => Ok(fragment),
            found if found == artist_id => Ok(fragment),
            found => Err(FragmentError::Mismatch {
                kind: F::KIND,
                expected: artist_id,
                found,
            }),
        }
    }

    fn settle<F: Fragment>(
        artist_id: u32,
        result: Result<F, FragmentError>,
        failures: &mut FragmentFailures,
    ) -> F {
        match result {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!("Artist {}: {}; continuing with empty {}", artist_id, e, F::KIND);
                failures.record(F::KIND);
                F::empty_for(artist_id)
            }
        }
    }

    async fn join_artist(&self, artist: ArtistSummary) -> JoinedArtist {
        let id = artist.id;
        let (locations, concert_dates, relations) = tokio::join!(
            self.fetch_fragment::<LocationsFragment>(id, &artist.locations),
            self.fetch_fragment::<ConcertDatesFragment>(id, &artist.concert_dates),
            self.fetch_fragment::<RelationsFragment>(id, &artist.relations),
        );

        let mut failures = FragmentFailures::default();
        let record = CompositeRecord {
            locations: Self::settle(id, locations, &mut failures),
            concert_dates: Self::settle(id, concert_dates, &mut failures),
            relations: Self::settle(id, relations, &mut failures),
            artist,
        };

        JoinedArtist { record, failures }
    }
}

#[async_trait]
impl SnapshotBuilder for ArtistAggregator {
    async fn build_snapshot(&self, build_id: Uuid) -> Result<BuildOutcome, BuildError> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let summaries = self.fetch_listing().await?;
        let total = summaries.len();
        info!("Fetched {} artist summaries from {}", total, self.base_url);
        self.state_manager.report_joined(build_id, 0, total, 0).await;

        // `buffered` yields in input order, so completion order cannot reorder records
        let mut joined = stream::iter(summaries)
            .map(|summary| self.join_artist(summary))
            .buffered(self.max_concurrency);

        let mut records = Vec::with_capacity(total);
        let mut fragment_failures = FragmentFailures::default();
        let mut degraded_artists = 0;

        while let Some(artist) = joined.next().await {
            if artist.failures.total() > 0 {
                degraded_artists += 1;
            }
            fragment_failures.merge(&artist.failures);
            records.push(artist.record);

            if records.len() % self.progress_update_interval == 0 || records.len() == total {
                self.state_manager
                    .report_joined(build_id, records.len(), total, fragment_failures.total())
                    .await;
            }
        }

        if fragment_failures.total() > 0 {
            warn!(
                "Build {} joined {} artists with {} missing fragments ({} artists degraded)",
                build_id,
                total,
                fragment_failures.total(),
                degraded_artists
            );
        }

        let report = BuildReport {
            build_id,
            artists: records.len(),
            degraded_artists,
            fragment_failures,
            started_at,
            completed_at: Utc::now(),
            duration_ms: timer.elapsed().as_millis() as u64,
        };

        Ok(BuildOutcome {
            snapshot: Snapshot::new(build_id, records),
            report,
        })
    }
}
