use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("record without catalog id in {file}")]
    MissingCatalogId { file: String },
    #[error("object {catalog_id}: epoch {next} is earlier than {prev}")]
    EpochOrder {
        catalog_id: u32,
        prev: DateTime<Utc>,
        next: DateTime<Utc>,
    },
    #[error("epoch {epoch} is earlier than the open bucket {bucket}")]
    BucketOrder { epoch: DateTime<Utc>, bucket: String },
    #[error("reader thread panicked")]
    ReaderPanic,
}
