use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::BuildError;
use crate::models::BuildOutcome;

pub mod aggregator;
pub mod scheduler;
pub mod state_manager;

pub use aggregator::{ArtistAggregator, FragmentError, RetryPolicy};
pub use scheduler::RefreshScheduler;
pub use state_manager::BuildStateManager;

/// Produces complete snapshots from the upstream source
///
/// Implemented by [`ArtistAggregator`]; the cache only depends on this trait
/// so tests can substitute canned builds.
#[async_trait]
pub trait SnapshotBuilder: Send + Sync {
    async fn build_snapshot(&self, build_id: Uuid) -> Result<BuildOutcome, BuildError>;
}
