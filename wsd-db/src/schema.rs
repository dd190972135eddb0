//! SQL schema of the in-memory store and column-name normalization for the
//! backing measurements table.
//!
//! Backing tables come from several pipeline versions that disagree on a
//! few column names. [`ColumnMap::resolve`] maps whatever names a table has
//! onto the canonical columns once, before any row is read.

/// Returns the canonical observation schema as a single batch string.
///
/// - `observations` - one normalized measurement row per source row.
///   `sensor_class` is `'radar'`, `'optical'` or NULL (no sensor id) and is
///   decided once at import. `row_id` preserves source order for stable ties.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS observations (
        row_id INTEGER PRIMARY KEY,
        site_id TEXT NOT NULL,
        sensor_id TEXT,
        sensor_class TEXT,
        date TEXT NOT NULL,
        area_km2 REAL,
        ndwi_area_km2 REAL,
        flagged INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_obs_site ON observations(site_id);
    CREATE INDEX IF NOT EXISTS idx_obs_date ON observations(date);
    "#
}

/// Default name of the backing measurements table.
pub const DEFAULT_TABLE: &str = "water_surface_detection_v3";

/// Accepted names per canonical column, in order of preference.
pub const SITE_COLUMNS: [&str; 2] = ["loc", "site_id"];
pub const SENSOR_COLUMNS: [&str; 2] = ["sat_id", "sensor_id"];
pub const TIMESTAMP_COLUMNS: [&str; 2] = ["time", "timestamp"];
pub const AREA_COLUMNS: [&str; 2] = ["area_km2", "classified_area_km2"];
pub const NDWI_AREA_COLUMNS: [&str; 2] = ["ndwi_area_km2", "index_area_km2"];
/// Quality flag columns. A row is clean when any present flag equals 0.
pub const FLAG_COLUMNS: [&str; 3] = ["error", "error_vis", "error_flag"];

/// Source column names resolved for each canonical column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    pub site: String,
    pub sensor: String,
    pub timestamp: String,
    pub area: String,
    pub ndwi_area: Option<String>,
    pub flags: Vec<String>,
}

impl ColumnMap {
    /// Resolve canonical columns against the names a source actually has.
    ///
    /// Matching is case-insensitive. When several synonyms are present the
    /// earlier one in the candidate list wins. A missing required column is
    /// an error.
    pub fn resolve<S: AsRef<str>>(available: &[S]) -> anyhow::Result<ColumnMap> {
        let find = |candidates: &[&str]| -> Option<String> {
            candidates.iter().find_map(|candidate| {
                available
                    .iter()
                    .map(|name| name.as_ref())
                    .find(|name| name.eq_ignore_ascii_case(candidate))
                    .map(str::to_string)
            })
        };
        let require = |candidates: &[&str]| -> anyhow::Result<String> {
            find(candidates).ok_or_else(|| {
                anyhow::anyhow!(
                    "missing required column (expected one of: {})",
                    candidates.join(", ")
                )
            })
        };

        let map = ColumnMap {
            site: require(&SITE_COLUMNS)?,
            sensor: require(&SENSOR_COLUMNS)?,
            timestamp: require(&TIMESTAMP_COLUMNS)?,
            area: require(&AREA_COLUMNS)?,
            ndwi_area: find(&NDWI_AREA_COLUMNS),
            flags: FLAG_COLUMNS
                .iter()
                .filter_map(|flag| find(&[*flag]))
                .collect(),
        };
        log::debug!("[WSD] schema: resolved columns {:?}", map);
        Ok(map)
    }

    /// Source columns in the order the loader reads them:
    /// site, sensor, timestamp, area, ndwi area (if any), flags.
    pub fn select_list(&self) -> Vec<&str> {
        let mut columns = vec![
            self.site.as_str(),
            self.sensor.as_str(),
            self.timestamp.as_str(),
            self.area.as_str(),
        ];
        if let Some(ndwi) = &self.ndwi_area {
            columns.push(ndwi);
        }
        columns.extend(self.flags.iter().map(String::as_str));
        columns
    }
}

/// Quote an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
