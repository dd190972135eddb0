//! Result structs returned by the loader and queries.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Outcome of importing a backing table or CSV export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Rows stored in the observation table.
    pub imported: usize,
    /// Rows dropped because the site id was empty.
    pub skipped_missing_site: usize,
    /// Rows dropped because the timestamp could not be parsed.
    pub skipped_bad_timestamp: usize,
}

impl ImportReport {
    pub fn skipped(&self) -> usize {
        self.skipped_missing_site + self.skipped_bad_timestamp
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "imported {} rows, skipped {} without site id and {} with unparseable timestamps",
            self.imported, self.skipped_missing_site, self.skipped_bad_timestamp
        )
    }
}

/// First and last observation date present in the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateBounds {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

/// Row count per raw sensor id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorCount {
    pub sensor_id: Option<String>,
    pub count: usize,
}
