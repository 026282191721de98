//! Runtime store: catalog plus lazily loaded archive buckets, indexed per
//! object and evicted as the query time moves on.

mod error;
mod samples;

pub use error::DatasetError;
pub use samples::{SampleIndex, TleSample};

use std::collections::HashSet;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer};

use crate::archive::{ArchiveSource, BucketSchedule, ElementRow};
use crate::catalog::Catalog;

fn duration_from_str<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let std = humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)?;
    Duration::from_std(std).map_err(serde::de::Error::custom)
}

fn default_accuracy() -> Duration {
    Duration::weeks(2)
}

fn default_lookahead() -> Duration {
    Duration::days(30)
}

fn default_purge_buffer() -> Duration {
    Duration::days(365)
}

fn default_purge_batch() -> usize {
    1000
}

fn default_update_period() -> Duration {
    Duration::minutes(1)
}

/// Retention and interpolation tuning. Durations are humantime strings in
/// the YAML file ("14days", "1m").
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// How far an element set stays trustworthy around its epoch; doubles
    /// as the closest-sample tolerance and the purge margin.
    #[serde(default = "default_accuracy", deserialize_with = "duration_from_str")]
    pub accuracy: Duration,
    /// How far past the query time `advance_to` pre-loads buckets.
    #[serde(default = "default_lookahead", deserialize_with = "duration_from_str")]
    pub lookahead: Duration,
    /// Forward extent of the retention window.
    #[serde(
        default = "default_purge_buffer",
        deserialize_with = "duration_from_str"
    )]
    pub purge_buffer: Duration,
    /// Each purge call visits every n-th object, so one object is revisited
    /// after this many calls.
    #[serde(default = "default_purge_batch")]
    pub purge_batch: usize,
    /// Spacing of the interpolator's anchor points.
    #[serde(
        default = "default_update_period",
        deserialize_with = "duration_from_str"
    )]
    pub update_period: Duration,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            accuracy: default_accuracy(),
            lookahead: default_lookahead(),
            purge_buffer: default_purge_buffer(),
            purge_batch: default_purge_batch(),
            update_period: default_update_period(),
        }
    }
}

impl DatasetConfig {
    pub fn from_file(path: &Path) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path)?;
        let config: DatasetConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Catalog, per-object sample indexes and the set of loaded buckets for one
/// archive. `advance_to` and `purge` both take `&mut self`, so loading and
/// eviction never race.
pub struct Dataset<S> {
    source: S,
    config: DatasetConfig,
    schedule: BucketSchedule,
    catalog: Catalog,
    samples: Vec<SampleIndex>,
    loaded: HashSet<usize>,
    purge_cursor: usize,
}

impl<S: ArchiveSource> Dataset<S> {
    /// Fetches and parses the catalog and sizes the sample arena. Bucket
    /// contents are only fetched on demand by `advance_to`.
    pub fn open(
        source: S,
        schedule: BucketSchedule,
        config: DatasetConfig,
    ) -> Result<Self, DatasetError> {
        let reader = BufReader::new(GzDecoder::new(source.fetch_catalog()?));
        let catalog = Catalog::from_reader(reader)?;
        info!(
            "catalog loaded: {} objects, {} buckets scheduled",
            catalog.len(),
            schedule.len()
        );
        let samples = (0..catalog.len()).map(|_| SampleIndex::new()).collect();
        Ok(Self {
            source,
            config,
            schedule,
            catalog,
            samples,
            loaded: HashSet::new(),
            purge_cursor: 0,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn samples(&self, slot: usize) -> Option<&SampleIndex> {
        self.samples.get(slot)
    }

    pub fn loaded_buckets(&self) -> usize {
        self.loaded.len()
    }

    /// Loads every not-yet-loaded bucket between `t` and `t + lookahead`.
    /// Fetch and parse failures surface to the caller; the failed bucket
    /// stays unloaded, so a retry fetches it again.
    pub fn advance_to(&mut self, t: DateTime<Utc>) -> Result<(), DatasetError> {
        let first = self.schedule.index_of(t);
        let last = self.schedule.index_of(t + self.config.lookahead);
        for index in first..=last {
            if self.loaded.contains(&index) {
                continue;
            }
            self.load_bucket(index)?;
            self.loaded.insert(index);
        }
        Ok(())
    }

    fn load_bucket(&mut self, index: usize) -> Result<(), DatasetError> {
        let Some(bucket) = self.schedule.get(index) else {
            return Ok(());
        };
        let reader = BufReader::new(GzDecoder::new(self.source.fetch_bucket(&bucket.name)?));
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut inserted = 0u64;
        let mut skipped = 0u64;
        for record in csv_reader.records() {
            let record = record?;
            let Some(row) = ElementRow::parse(&record) else {
                skipped += 1;
                continue;
            };
            let Some(slot) = self.catalog.index_of(row.catalog_id) else {
                skipped += 1;
                continue;
            };
            match TleSample::from_lines(row.epoch, &row.line1, &row.line2) {
                Ok(sample) => {
                    self.samples[slot].insert(sample);
                    inserted += 1;
                }
                Err(err) => {
                    warn!(
                        "object {}: unusable elements at {}: {}",
                        row.catalog_id, row.epoch, err
                    );
                    skipped += 1;
                }
            }
        }
        debug!(
            "bucket {}: {} samples loaded, {} skipped",
            bucket.name, inserted, skipped
        );
        Ok(())
    }

    /// Evicts buckets whose range left the retention window
    /// `[t - accuracy, t + purge_buffer + accuracy]`, then trims the sample
    /// indexes of every `purge_batch`-th object, rotating the start slot so
    /// each call does a bounded share of the work.
    pub fn purge(&mut self, t: DateTime<Utc>) {
        let start = t - self.config.accuracy;
        let end = t + self.config.purge_buffer + self.config.accuracy;

        let schedule = &self.schedule;
        self.loaded.retain(|&index| match schedule.get(index) {
            Some(bucket) => bucket.start <= end && start < bucket.end,
            None => false,
        });

        let batch = self.config.purge_batch.max(1);
        let cursor = self.purge_cursor;
        self.purge_cursor = (cursor + 1) % batch;
        for slot in (cursor..self.samples.len()).step_by(batch) {
            self.samples[slot].purge_range(start, end);
        }
    }
}
