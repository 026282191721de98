//! Offline pass that turns raw element dumps into the bucketed archive.
//!
//! One reader thread decompresses and parses the raw files in name order
//! and feeds a bounded channel; the consumer merges catalog fields, thins
//! epochs per object and writes bucket files. The channel is the only
//! coupling: the reader stalls when the consumer lags, the consumer blocks
//! when the reader lags, and dropping the receiver stops the reader early.

mod error;
mod raw;
mod thin;
mod writer;

pub use error::AggregateError;
pub use raw::{list_raw_files, spawn_reader, RawCounts, RawRecord};
pub use thin::{EpochThinner, ELEMENT_GAP};
pub use writer::BucketWriter;

use std::fs::{self, File};
use std::io;
use std::path::Path;

use crossbeam_channel::Receiver;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{info, warn};

use crate::archive::CATALOG_FILE;
use crate::catalog::{Catalog, CatalogBuilder};

#[derive(Debug, Clone, Copy)]
pub struct AggregateSummary {
    pub raw: RawCounts,
    pub objects: usize,
    pub buckets: usize,
    pub archived: u64,
}

/// Runs the whole pipeline: `raw_dir/*.csv.gz` in, bucket files plus the
/// merged catalog in `out_dir`.
pub fn run(raw_dir: &Path, out_dir: &Path) -> Result<AggregateSummary, AggregateError> {
    fs::create_dir_all(out_dir)?;
    let files = list_raw_files(raw_dir)?;
    info!(
        "aggregating {} raw files from {}",
        files.len(),
        raw_dir.display()
    );

    let (rx, reader) = spawn_reader(files);
    let mut builder = CatalogBuilder::new();
    let mut thinner = EpochThinner::new();
    let mut writer = BucketWriter::create(out_dir)?;

    // consume() owns the receiver, so the reader is unblocked (and stops)
    // as soon as the consumer returns for any reason
    let consumed = consume(rx, &mut builder, &mut thinner, &mut writer);
    let produced = reader.join().map_err(|_| AggregateError::ReaderPanic)?;
    consumed?;
    let raw = produced?;

    for row in thinner.flush_pending() {
        writer.write(&row)?;
    }
    let archived = writer.rows();
    let buckets = writer.files();
    writer.finish()?;

    let catalog = builder.finalize();
    write_catalog(out_dir, &catalog)?;

    if raw.skipped > 0 {
        warn!("skipped {} unusable raw rows", raw.skipped);
    }
    info!(
        "archived {} of {} records for {} objects across {} buckets",
        archived,
        raw.records,
        catalog.len(),
        buckets
    );
    Ok(AggregateSummary {
        raw,
        objects: catalog.len(),
        buckets,
        archived,
    })
}

fn consume(
    rx: Receiver<RawRecord>,
    builder: &mut CatalogBuilder,
    thinner: &mut EpochThinner,
    writer: &mut BucketWriter,
) -> Result<(), AggregateError> {
    for raw in rx {
        builder.merge(&raw.object_fields());
        writer.check_epoch(raw.epoch)?;
        if writer.needs_rotation(raw.epoch) {
            // pending samples belong to the bucket that is about to close;
            // committing them here keeps every bucket file self-contained
            for row in thinner.flush_pending() {
                writer.write(&row)?;
            }
            writer.rotate_to(raw.epoch)?;
        }
        if let Some(row) = thinner.ingest(raw.into_element_row())? {
            writer.write(&row)?;
        }
    }
    Ok(())
}

fn write_catalog(out_dir: &Path, catalog: &Catalog) -> Result<(), AggregateError> {
    let file = File::create(out_dir.join(CATALOG_FILE))?;
    let mut writer = csv::Writer::from_writer(GzEncoder::new(file, Compression::default()));
    for satellite in catalog.iter() {
        writer.write_record(&satellite.to_row().to_record())?;
    }
    let gz = writer
        .into_inner()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    gz.finish()?;
    Ok(())
}
