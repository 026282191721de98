use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::error::AggregateError;
use crate::archive::ElementRow;

/// Minimum spacing between archived element sets of one object. Fresh
/// elements predict well for about this long, so denser history adds
/// nothing the interpolator can use.
pub const ELEMENT_GAP: Duration = Duration::weeks(2);

#[derive(Debug, Default)]
struct ObjectState {
    last_committed: Option<DateTime<Utc>>,
    pending: Option<ElementRow>,
}

/// Per-object epoch thinning. Each object keeps one uncommitted pending
/// sample; a new record whose epoch runs more than `ELEMENT_GAP` past the
/// last committed epoch commits the pending sample, so the archive keeps
/// the freshest sample before every gap rather than the first after it.
#[derive(Debug)]
pub struct EpochThinner {
    objects: HashMap<u32, ObjectState>,
}

impl EpochThinner {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
        }
    }

    /// Feeds one record in per-object epoch order; yields at most one row
    /// ready for the archive. Epoch regression within an object means the
    /// input is corrupt and aborts the run.
    pub fn ingest(&mut self, row: ElementRow) -> Result<Option<ElementRow>, AggregateError> {
        let state = self.objects.entry(row.catalog_id).or_default();
        let newest = state.pending.as_ref().map(|p| p.epoch).or(state.last_committed);
        if let Some(prev) = newest {
            if row.epoch < prev {
                return Err(AggregateError::EpochOrder {
                    catalog_id: row.catalog_id,
                    prev,
                    next: row.epoch,
                });
            }
        }
        let mut emitted = None;
        match (state.last_committed, state.pending.take()) {
            (None, _) => state.last_committed = Some(row.epoch),
            (Some(committed), Some(pending)) if row.epoch - committed > ELEMENT_GAP => {
                state.last_committed = Some(pending.epoch);
                emitted = Some(pending);
            }
            _ => {}
        }
        state.pending = Some(row);
        Ok(emitted)
    }

    /// Commits and drains every pending sample, ordered by epoch then id so
    /// the flushed tail of a bucket is deterministic. Called when a bucket
    /// closes and once at end of stream.
    pub fn flush_pending(&mut self) -> Vec<ElementRow> {
        let mut rows = Vec::new();
        for state in self.objects.values_mut() {
            if let Some(pending) = state.pending.take() {
                state.last_committed = Some(pending.epoch);
                rows.push(pending);
            }
        }
        rows.sort_by_key(|row| (row.epoch, row.catalog_id));
        rows
    }
}

impl Default for EpochThinner {
    fn default() -> Self {
        Self::new()
    }
}
