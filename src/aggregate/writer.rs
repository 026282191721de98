use std::fs::File;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;

use super::error::AggregateError;
use crate::archive::{day_string, next_boundary, Bucket, ElementRow};

/// Writes thinned rows into per-bucket `<day>.csv.gz` files, rotating
/// whenever the incoming epoch crosses a bucket boundary. Every bucket
/// rotated through gets a file, empty history included, so the whole
/// schedule stays fetchable.
pub struct BucketWriter {
    dir: PathBuf,
    bucket: Bucket,
    writer: csv::Writer<GzEncoder<File>>,
    files: usize,
    rows: u64,
}

impl BucketWriter {
    /// Opens the first bucket of the schedule.
    pub fn create(dir: &Path) -> Result<Self, AggregateError> {
        let bucket = bucket_at(next_boundary(None));
        let writer = open_bucket(dir, &bucket)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            bucket,
            writer,
            files: 1,
            rows: 0,
        })
    }

    pub fn files(&self) -> usize {
        self.files
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn needs_rotation(&self, epoch: DateTime<Utc>) -> bool {
        epoch >= self.bucket.end
    }

    /// Closes the open bucket and every empty one after it until the bucket
    /// containing `epoch` is open.
    pub fn rotate_to(&mut self, epoch: DateTime<Utc>) -> Result<(), AggregateError> {
        while self.needs_rotation(epoch) {
            let next = bucket_at(self.bucket.end);
            let writer = open_bucket(&self.dir, &next)?;
            close_bucket(mem::replace(&mut self.writer, writer))?;
            self.bucket = next;
            self.files += 1;
        }
        Ok(())
    }

    /// The stream is globally epoch-ordered, so an epoch from before the
    /// open bucket means corrupt input.
    pub fn check_epoch(&self, epoch: DateTime<Utc>) -> Result<(), AggregateError> {
        if epoch < self.bucket.start {
            return Err(AggregateError::BucketOrder {
                epoch,
                bucket: self.bucket.name.clone(),
            });
        }
        Ok(())
    }

    /// Appends one row to the open bucket.
    pub fn write(&mut self, row: &ElementRow) -> Result<(), AggregateError> {
        self.check_epoch(row.epoch)?;
        self.writer.write_record(&row.to_record())?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<(), AggregateError> {
        close_bucket(self.writer)
    }
}

fn bucket_at(start: DateTime<Utc>) -> Bucket {
    Bucket {
        name: day_string(start),
        start,
        end: next_boundary(Some(start)),
    }
}

fn open_bucket(
    dir: &Path,
    bucket: &Bucket,
) -> Result<csv::Writer<GzEncoder<File>>, AggregateError> {
    let path = dir.join(format!("{}.csv.gz", bucket.name));
    debug!("opening bucket {}", path.display());
    let file = File::create(path)?;
    Ok(csv::Writer::from_writer(GzEncoder::new(
        file,
        Compression::default(),
    )))
}

fn close_bucket(writer: csv::Writer<GzEncoder<File>>) -> Result<(), AggregateError> {
    let gz = writer
        .into_inner()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    gz.finish()?;
    Ok(())
}
