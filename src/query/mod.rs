//! Read side of the catalogue
//!
//! [`ArtistQueryService`] serves the two downstream operations, filtered
//! listing and lookup by id, against whatever snapshot is published when the
//! call starts. Both are synchronous over an `Arc` clone of the snapshot, so a
//! concurrent rebuild never changes a result half-way.

use std::sync::Arc;

use crate::cache::SnapshotCache;
use crate::errors::AppResult;
use crate::models::CompositeRecord;

pub mod filter_engine;
pub mod lookup;

pub use filter_engine::{FilterCriteria, FilterEngine, Predicate};
pub use lookup::find_artist;

#[derive(Clone)]
pub struct ArtistQueryService {
    cache: SnapshotCache,
    engine: Arc<FilterEngine>,
}

impl ArtistQueryService {
    pub fn new(cache: SnapshotCache, engine: FilterEngine) -> Self {
        Self {
            cache,
            engine: Arc::new(engine),
        }
    }

    /// Artists matching `criteria`, in listing order
    pub async fn search(&self, criteria: &FilterCriteria) -> AppResult<Vec<CompositeRecord>> {
        let snapshot = self.cache.get().await?;
        let view = self.engine.apply(snapshot.records(), criteria);
        Ok(view.into_iter().cloned().collect())
    }

    pub async fn get_artist(&self, id: u32) -> AppResult<CompositeRecord> {
        let snapshot = self.cache.get().await?;
        find_artist(&snapshot, id).cloned()
    }
}
