use crate::errors::{AppError, AppResult};
use crate::models::{CompositeRecord, Snapshot};

/// Resolve one artist, distinguishing "no such artist" from any record
pub fn find_artist(snapshot: &Snapshot, id: u32) -> AppResult<&CompositeRecord> {
    snapshot
        .by_id(id)
        .ok_or_else(|| AppError::not_found("artist", id.to_string()))
}
