mod buckets;
mod rows;
mod source;

pub use buckets::{day_string, next_boundary, parse_day_string, Bucket, BucketSchedule};
pub(crate) use rows::sanitize_field;
pub use rows::{CatalogRow, ElementRow};
pub use source::{ArchiveSource, DirSource, CATALOG_FILE};
