use chrono::{DateTime, Utc};

/// Replaces commas so rows stay splittable by naive consumers.
pub(crate) fn sanitize_field(value: &str) -> String {
    value.replace(',', ".")
}

fn millis_string(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.timestamp_millis().to_string()).unwrap_or_default()
}

fn parse_millis(field: &str) -> Option<Option<DateTime<Utc>>> {
    if field.is_empty() {
        return Some(None);
    }
    let millis = field.parse::<i64>().ok()?;
    Some(Some(DateTime::from_timestamp_millis(millis)?))
}

/// One archived element set:
/// `catalogId,epochMillis,revolutionsAtEpoch,elementLine1,elementLine2`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRow {
    pub catalog_id: u32,
    pub epoch: DateTime<Utc>,
    pub rev_at_epoch: String,
    pub line1: String,
    pub line2: String,
}

impl ElementRow {
    pub fn to_record(&self) -> [String; 5] {
        [
            self.catalog_id.to_string(),
            self.epoch.timestamp_millis().to_string(),
            self.rev_at_epoch.clone(),
            self.line1.clone(),
            self.line2.clone(),
        ]
    }

    /// None for malformed rows; callers skip and count them.
    pub fn parse(record: &csv::StringRecord) -> Option<Self> {
        if record.len() < 5 {
            return None;
        }
        let catalog_id = record.get(0)?.parse::<u32>().ok()?;
        let epoch = DateTime::from_timestamp_millis(record.get(1)?.parse::<i64>().ok()?)?;
        Some(Self {
            catalog_id,
            epoch,
            rev_at_epoch: record.get(2)?.to_string(),
            line1: record.get(3)?.to_string(),
            line2: record.get(4)?.to_string(),
        })
    }
}

/// One merged catalog entry:
/// `catalogId,objectDesignator,name,objectClass,sizeClass,countryCode,
/// launchDateMillis,launchSite,decayDateMillis`.
/// Date fields are empty strings when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub catalog_id: u32,
    pub object_id: String,
    pub name: String,
    pub object_class: String,
    pub size_class: String,
    pub country_code: String,
    pub launch_date: Option<DateTime<Utc>>,
    pub launch_site: String,
    pub decay_date: Option<DateTime<Utc>>,
}

impl CatalogRow {
    pub fn to_record(&self) -> [String; 9] {
        [
            self.catalog_id.to_string(),
            self.object_id.clone(),
            self.name.clone(),
            self.object_class.clone(),
            self.size_class.clone(),
            self.country_code.clone(),
            millis_string(self.launch_date),
            self.launch_site.clone(),
            millis_string(self.decay_date),
        ]
    }

    pub fn parse(record: &csv::StringRecord) -> Option<Self> {
        if record.len() < 9 {
            return None;
        }
        Some(Self {
            catalog_id: record.get(0)?.parse::<u32>().ok()?,
            object_id: record.get(1)?.to_string(),
            name: record.get(2)?.to_string(),
            object_class: record.get(3)?.to_string(),
            size_class: record.get(4)?.to_string(),
            country_code: record.get(5)?.to_string(),
            launch_date: parse_millis(record.get(6)?)?,
            launch_site: record.get(7)?.to_string(),
            decay_date: parse_millis(record.get(8)?)?,
        })
    }
}
