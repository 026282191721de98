use chrono::{DateTime, Duration, Months, NaiveDate, Utc};

pub fn day_string(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d").to_string()
}

pub fn parse_day_string(s: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn calendar_day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .expect("valid calendar day")
}

/// Next bucket boundary after `previous`, or the archive start when `previous`
/// is absent. Element density per object grows over the catalog's history, so
/// bucket widths shrink from a year down to 15 days to keep per-file volume
/// roughly bounded.
pub fn next_boundary(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let Some(previous) = previous else {
        return calendar_day(1959, 1, 1);
    };
    if previous < calendar_day(1970, 1, 1) {
        previous + Months::new(12)
    } else if previous < calendar_day(1975, 1, 1) {
        previous + Months::new(3)
    } else if previous < calendar_day(1990, 1, 1) {
        previous + Months::new(1)
    } else {
        previous + Duration::days(15)
    }
}

/// One archive file's time range. The name doubles as the file key.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Bucket {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// The full boundary list, generated once and shared read-only.
#[derive(Debug, Clone)]
pub struct BucketSchedule {
    buckets: Vec<Bucket>,
}

impl BucketSchedule {
    /// Builds the schedule from the archive start through the bucket
    /// containing `end_day`.
    pub fn through(end_day: DateTime<Utc>) -> Self {
        let mut buckets = Vec::new();
        let mut start = next_boundary(None);
        loop {
            let end = next_boundary(Some(start));
            buckets.push(Bucket {
                name: day_string(start),
                start,
                end,
            });
            if end > end_day {
                break;
            }
            start = end;
        }
        Self { buckets }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bucket> {
        self.buckets.get(index)
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Index of the bucket containing `t`, clamped to the schedule's ends.
    pub fn index_of(&self, t: DateTime<Utc>) -> usize {
        let idx = self.buckets.partition_point(|b| b.start <= t);
        idx.saturating_sub(1)
    }
}
