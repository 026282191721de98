use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, Elements};

use super::error::DatasetError;

/// One loaded element set, parsed and ready to propagate.
pub struct TleSample {
    pub epoch: DateTime<Utc>,
    pub elements: Elements,
    pub constants: Constants,
}

impl TleSample {
    pub fn from_lines(
        epoch: DateTime<Utc>,
        line1: &str,
        line2: &str,
    ) -> Result<Self, DatasetError> {
        let elements = Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())?;
        let constants = Constants::from_elements(&elements)?;
        Ok(Self {
            epoch,
            elements,
            constants,
        })
    }
}

/// Epoch-sorted element sets of one object.
#[derive(Default)]
pub struct SampleIndex {
    samples: Vec<TleSample>,
}

impl SampleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Inserts at the sorted position; a sample at an already-present epoch
    /// replaces the old one.
    pub fn insert(&mut self, sample: TleSample) {
        let idx = self.samples.partition_point(|s| s.epoch < sample.epoch);
        match self.samples.get_mut(idx) {
            Some(existing) if existing.epoch == sample.epoch => *existing = sample,
            _ => self.samples.insert(idx, sample),
        }
    }

    /// The sample nearest to `t`, if one lies within `tolerance` on either
    /// side. Ties go to the earlier sample.
    pub fn closest(&self, t: DateTime<Utc>, tolerance: Duration) -> Option<&TleSample> {
        let idx = self.samples.partition_point(|s| s.epoch < t);
        let after = self.samples.get(idx).filter(|s| s.epoch - t <= tolerance);
        let before = idx
            .checked_sub(1)
            .and_then(|i| self.samples.get(i))
            .filter(|s| t - s.epoch <= tolerance);
        match (before, after) {
            (Some(b), Some(a)) => {
                if t - b.epoch <= a.epoch - t {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, None) => b,
            (None, a) => a,
        }
    }

    /// Retains only samples with epochs inside `[start, end]`.
    pub fn purge_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        let keep_end = self.samples.partition_point(|s| s.epoch <= end);
        self.samples.truncate(keep_end);
        let keep_start = self.samples.partition_point(|s| s.epoch < start);
        self.samples.drain(..keep_start);
    }
}
