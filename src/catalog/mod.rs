mod merge;

pub use merge::{CatalogBuilder, ObjectFields};

use std::collections::HashMap;
use std::io::Read;

use chrono::{DateTime, Utc};
use log::warn;

use crate::archive::CatalogRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Payload,
    RocketBody,
    Debris,
    Unknown,
}

impl ObjectClass {
    pub fn parse(value: &str) -> Self {
        match value {
            "PAYLOAD" => ObjectClass::Payload,
            "ROCKET BODY" => ObjectClass::RocketBody,
            "DEBRIS" => ObjectClass::Debris,
            _ => ObjectClass::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectClass::Payload => "PAYLOAD",
            ObjectClass::RocketBody => "ROCKET BODY",
            ObjectClass::Debris => "DEBRIS",
            ObjectClass::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SMALL" => Some(SizeClass::Small),
            "MEDIUM" => Some(SizeClass::Medium),
            "LARGE" => Some(SizeClass::Large),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Small => "SMALL",
            SizeClass::Medium => "MEDIUM",
            SizeClass::Large => "LARGE",
        }
    }

    /// Radar cross-section is rarely reported for debris; when the extract
    /// never supplied one, class it by object type.
    pub fn default_for(class: ObjectClass) -> Self {
        match class {
            ObjectClass::Debris => SizeClass::Small,
            _ => SizeClass::Large,
        }
    }
}

/// Launch metadata shared by every object from one launch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchInfo {
    pub country_code: Option<String>,
    pub launch_date: Option<DateTime<Utc>>,
    pub launch_site: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Satellite {
    pub catalog_id: u32,
    pub object_id: Option<String>,
    pub name: Option<String>,
    pub object_class: ObjectClass,
    pub size_class: SizeClass,
    pub launch: LaunchInfo,
    pub decay_date: Option<DateTime<Utc>>,
}

impl Satellite {
    pub fn to_row(&self) -> CatalogRow {
        CatalogRow {
            catalog_id: self.catalog_id,
            object_id: self.object_id.clone().unwrap_or_default(),
            name: self.name.clone().unwrap_or_default(),
            object_class: self.object_class.as_str().to_string(),
            size_class: self.size_class.as_str().to_string(),
            country_code: self.launch.country_code.clone().unwrap_or_default(),
            launch_date: self.launch.launch_date,
            launch_site: self.launch.launch_site.clone().unwrap_or_default(),
            decay_date: self.decay_date,
        }
    }

    pub fn from_row(row: CatalogRow) -> Self {
        let object_class = ObjectClass::parse(&row.object_class);
        let size_class = SizeClass::parse(&row.size_class)
            .unwrap_or_else(|| SizeClass::default_for(object_class));
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            catalog_id: row.catalog_id,
            object_id: non_empty(row.object_id),
            name: non_empty(row.name),
            object_class,
            size_class,
            launch: LaunchInfo {
                country_code: non_empty(row.country_code),
                launch_date: row.launch_date,
                launch_site: non_empty(row.launch_site),
            },
            decay_date: row.decay_date,
        }
    }
}

/// Index-stable arena of tracked objects. Positions are handed out once at
/// insertion and never move, so sample indexes and purge cursors can address
/// objects by plain integer slot.
#[derive(Debug, Default)]
pub struct Catalog {
    satellites: Vec<Satellite>,
    by_id: HashMap<u32, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    pub fn push(&mut self, satellite: Satellite) -> usize {
        match self.by_id.get(&satellite.catalog_id) {
            Some(&slot) => {
                self.satellites[slot] = satellite;
                slot
            }
            None => {
                let slot = self.satellites.len();
                self.by_id.insert(satellite.catalog_id, slot);
                self.satellites.push(satellite);
                slot
            }
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Satellite> {
        self.satellites.get(slot)
    }

    pub fn index_of(&self, catalog_id: u32) -> Option<usize> {
        self.by_id.get(&catalog_id).copied()
    }

    pub fn by_id(&self, catalog_id: u32) -> Option<&Satellite> {
        self.index_of(catalog_id).and_then(|slot| self.get(slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Satellite> {
        self.satellites.iter()
    }

    /// Parses the merged catalog CSV. Malformed rows are skipped.
    pub fn from_reader(reader: impl Read) -> Result<Self, csv::Error> {
        let mut catalog = Catalog::new();
        let mut skipped = 0usize;
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        for record in csv_reader.records() {
            let record = record?;
            match CatalogRow::parse(&record) {
                Some(row) => {
                    catalog.push(Satellite::from_row(row));
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("skipped {} malformed catalog rows", skipped);
        }
        Ok(catalog)
    }
}
