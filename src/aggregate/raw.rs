use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, NaiveDateTime, Utc};
use crossbeam_channel::{bounded, Receiver};
use flate2::read::GzDecoder;
use log::{debug, warn};

use super::error::AggregateError;
use crate::archive::{sanitize_field, ElementRow};
use crate::catalog::ObjectFields;

/// First field of the header row that repeats in every raw export.
const RAW_HEADER_LEAD: &str = "CCSDS_OMM_VERS";

/// Space-Track gp_history exports: CSV rendering of CCSDS OMM records,
/// forty columns, addressed by position.
const COL_OBJECT_NAME: usize = 4;
const COL_OBJECT_ID: usize = 5;
const COL_EPOCH: usize = 10;
const COL_NORAD_CAT_ID: usize = 19;
const COL_REV_AT_EPOCH: usize = 21;
const COL_OBJECT_TYPE: usize = 29;
const COL_RCS_SIZE: usize = 30;
const COL_COUNTRY_CODE: usize = 31;
const COL_LAUNCH_DATE: usize = 32;
const COL_SITE: usize = 33;
const COL_DECAY_DATE: usize = 34;
const COL_TLE_LINE1: usize = 38;
const COL_TLE_LINE2: usize = 39;

const COLUMN_COUNT: usize = 40;

/// How far the reader thread may run ahead of the consumer before its
/// `send` blocks.
const RAW_CHANNEL_CAPACITY: usize = 1024;

/// Epochs come as zone-less ISO timestamps; some tooling re-exports them
/// with an explicit offset.
fn parse_epoch(field: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(field) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(field, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|t| t.and_utc())
}

/// One raw history record, reduced to the columns the pipeline consumes.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub catalog_id: u32,
    pub epoch: DateTime<Utc>,
    pub name: String,
    pub object_id: String,
    pub object_type: String,
    pub rcs_size: String,
    pub country_code: String,
    pub launch_date: String,
    pub site: String,
    pub decay_date: String,
    pub rev_at_epoch: String,
    pub line1: String,
    pub line2: String,
}

impl RawRecord {
    /// `Ok(None)` for headers and rows too damaged to use; a present row
    /// without a catalog id aborts the run.
    pub fn from_record(
        record: &csv::StringRecord,
        file: &str,
    ) -> Result<Option<Self>, AggregateError> {
        if record.get(0) == Some(RAW_HEADER_LEAD) {
            return Ok(None);
        }
        if record.len() < COLUMN_COUNT {
            return Ok(None);
        }
        let field = |col: usize| record.get(col).unwrap_or_default().trim();
        let id_field = field(COL_NORAD_CAT_ID);
        if id_field.is_empty() {
            return Err(AggregateError::MissingCatalogId {
                file: file.to_string(),
            });
        }
        let catalog_id = match id_field.parse::<u32>() {
            Ok(id) => id,
            Err(_) => {
                warn!("{}: unusable catalog id {:?}, row skipped", file, id_field);
                return Ok(None);
            }
        };
        let epoch = match parse_epoch(field(COL_EPOCH)) {
            Some(epoch) => epoch,
            None => return Ok(None),
        };
        let line1 = field(COL_TLE_LINE1);
        let line2 = field(COL_TLE_LINE2);
        if line1.is_empty() || line2.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            catalog_id,
            epoch,
            name: sanitize_field(field(COL_OBJECT_NAME)),
            object_id: field(COL_OBJECT_ID).to_string(),
            object_type: field(COL_OBJECT_TYPE).to_string(),
            rcs_size: field(COL_RCS_SIZE).to_string(),
            country_code: field(COL_COUNTRY_CODE).to_string(),
            launch_date: field(COL_LAUNCH_DATE).to_string(),
            site: field(COL_SITE).to_string(),
            decay_date: field(COL_DECAY_DATE).to_string(),
            rev_at_epoch: field(COL_REV_AT_EPOCH).to_string(),
            line1: line1.to_string(),
            line2: line2.to_string(),
        }))
    }

    pub fn object_fields(&self) -> ObjectFields<'_> {
        ObjectFields {
            catalog_id: self.catalog_id,
            object_id: &self.object_id,
            name: &self.name,
            object_class: &self.object_type,
            size_class: &self.rcs_size,
            country_code: &self.country_code,
            launch_date: &self.launch_date,
            launch_site: &self.site,
            decay_date: &self.decay_date,
        }
    }

    pub fn into_element_row(self) -> ElementRow {
        ElementRow {
            catalog_id: self.catalog_id,
            epoch: self.epoch,
            rev_at_epoch: self.rev_at_epoch,
            line1: self.line1,
            line2: self.line2,
        }
    }
}

/// Totals reported by the reader thread when its input is exhausted.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawCounts {
    pub files: usize,
    pub records: u64,
    pub skipped: u64,
}

/// The `*.csv.gz` files of a raw dump, in name order. Exports are named by
/// date, so name order is chronological order.
pub fn list_raw_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.ends_with(".csv.gz") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Spawns the reader half of the pipeline: decompress and parse on a
/// dedicated thread, hand records over a bounded channel. The reader stalls
/// when the channel is full and stops early when the receiver is dropped.
pub fn spawn_reader(
    files: Vec<PathBuf>,
) -> (Receiver<RawRecord>, JoinHandle<Result<RawCounts, AggregateError>>) {
    let (tx, rx) = bounded(RAW_CHANNEL_CAPACITY);
    let handle = thread::spawn(move || {
        let mut counts = RawCounts {
            files: files.len(),
            ..RawCounts::default()
        };
        for path in &files {
            debug!("reading {}", path.display());
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let reader = BufReader::new(GzDecoder::new(File::open(path)?));
            let mut csv = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(reader);
            for record in csv.records() {
                match RawRecord::from_record(&record?, &name)? {
                    Some(raw) => {
                        counts.records += 1;
                        if tx.send(raw).is_err() {
                            // receiver gone: the consumer failed and the
                            // run is over
                            return Ok(counts);
                        }
                    }
                    None => counts.skipped += 1,
                }
            }
        }
        Ok(counts)
    });
    (rx, handle)
}
