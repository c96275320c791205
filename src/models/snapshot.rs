//! Immutable, fully joined artist collection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use super::CompositeRecord;

/// Point-in-time view of the source data
///
/// Records keep the order of the upstream artist listing. A snapshot is never
/// mutated once built; the cache replaces it wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub build_id: Uuid,
    pub built_at: DateTime<Utc>,
    records: Vec<CompositeRecord>,
    #[serde(skip)]
    index: HashMap<u32, usize>,
}

impl Snapshot {
    pub fn new(build_id: Uuid, records: Vec<CompositeRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.contains_key(&record.id()) {
                warn!(
                    "Duplicate artist id {} at position {}, keeping the first occurrence",
                    record.id(),
                    position
                );
                continue;
            }
            index.insert(record.id(), position);
        }

        Self {
            build_id,
            built_at: Utc::now(),
            records,
            index,
        }
    }

    pub fn records(&self) -> &[CompositeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record with the given artist id
    pub fn by_id(&self, id: u32) -> Option<&CompositeRecord> {
        self.index.get(&id).map(|&position| &self.records[position])
    }
}
