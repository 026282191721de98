use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use super::buckets::parse_day_string;

pub const CATALOG_FILE: &str = "satellites.csv.gz";

/// Byte-stream access to a published archive. Streams are gzip-compressed;
/// transport concerns (HTTP, auth, retries) stay with the implementation.
pub trait ArchiveSource {
    fn fetch_bucket(&self, name: &str) -> io::Result<Box<dyn Read>>;
    fn fetch_catalog(&self) -> io::Result<Box<dyn Read>>;
}

/// Archive laid out as one directory of `<day>.csv.gz` files plus the catalog.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Bucket day names present in the directory, sorted ascending.
    pub fn bucket_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.root.read_dir()? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(".csv.gz")) else {
                continue;
            };
            if parse_day_string(name).is_some() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl ArchiveSource for DirSource {
    fn fetch_bucket(&self, name: &str) -> io::Result<Box<dyn Read>> {
        let file = File::open(self.root.join(format!("{}.csv.gz", name)))?;
        Ok(Box::new(file))
    }

    fn fetch_catalog(&self) -> io::Result<Box<dyn Read>> {
        let file = File::open(self.root.join(CATALOG_FILE))?;
        Ok(Box::new(file))
    }
}
