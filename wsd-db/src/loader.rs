//! Normalizing import of measurement rows into the in-memory store.
//!
//! Both sources (the backing SQLite table and CSV exports of it) resolve
//! their column names once with [`ColumnMap::resolve`], read each row into a
//! [`RawRow`] of loosely typed SQLite values, and share one conversion path
//! into the canonical `observations` table.
//!
//! # Conversion rules
//!
//! - **site id**: integers (or integral reals) become their decimal text; an
//!   empty site id drops the row.
//! - **timestamp**: text in any layout accepted by
//!   [`wsd_utils::dates::parse_timestamp`], or unix seconds; unparseable
//!   timestamps drop the row.
//! - **areas**: numeric or numeric text; anything else is stored as NULL and
//!   the row is kept.
//! - **flags**: a row is flagged unless at least one present flag column is
//!   zero. Tables without flag columns never flag a row.

use crate::models::ImportReport;
use crate::schema::{quote_ident, ColumnMap};
use crate::Database;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use wsd_core::observation::SensorClass;
use wsd_utils::dates::{date_from_unix_seconds, parse_timestamp};
use wsd_utils::error::DateError;

/// One source row before normalization.
#[derive(Debug, Clone)]
struct RawRow {
    site: Value,
    sensor: Value,
    timestamp: Value,
    area: Value,
    ndwi_area: Value,
    flags: Vec<Value>,
}

impl Database {
    /// Import every row of `table` from an open source connection.
    pub fn import_table(&self, source: &Connection, table: &str) -> anyhow::Result<ImportReport> {
        let mut info = source.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let names: Vec<String> = info
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        if names.is_empty() {
            anyhow::bail!("table '{}' not found", table);
        }
        let map = ColumnMap::resolve(&names)?;

        let select = map
            .select_list()
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = source.prepare(&format!("SELECT {} FROM {}", select, quote_ident(table)))?;

        let has_ndwi = map.ndwi_area.is_some();
        let first_flag = if has_ndwi { 5 } else { 4 };
        let flag_count = map.flags.len();
        let raw_rows = stmt
            .query_map([], |row| {
                Ok(RawRow {
                    site: row.get(0)?,
                    sensor: row.get(1)?,
                    timestamp: row.get(2)?,
                    area: row.get(3)?,
                    ndwi_area: if has_ndwi { row.get(4)? } else { Value::Null },
                    flags: (first_flag..first_flag + flag_count)
                        .map(|i| row.get(i))
                        .collect::<Result<Vec<Value>, _>>()?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "[WSD] loader: Read {} rows from table '{}'",
            raw_rows.len(),
            table
        );
        self.insert_rows(raw_rows)
    }

    /// Load observations from a CSV export of the measurements table.
    ///
    /// The header row is required and may use any of the accepted column
    /// name variants. Empty fields are treated as NULL.
    ///
    /// # Example CSV
    /// ```text
    /// loc,sat_id,time,area_km2,ndwi_area_km2,error
    /// 10,S1_GRD,2020-01-01,5.0,,0
    /// 10,LANDSAT/LC08,2020-02-01,5.5,5.2,0
    /// ```
    pub fn load_csv(&self, csv_data: &str) -> anyhow::Result<ImportReport> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let map = ColumnMap::resolve(&headers)?;
        let position = |name: &str| headers.iter().position(|h| h == name);
        let site_at = position(map.site.as_str());
        let sensor_at = position(map.sensor.as_str());
        let timestamp_at = position(map.timestamp.as_str());
        let area_at = position(map.area.as_str());
        let ndwi_at = map.ndwi_area.as_deref().and_then(position);
        let flags_at: Vec<Option<usize>> = map.flags.iter().map(|f| position(f.as_str())).collect();

        let mut raw_rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let field = |at: Option<usize>| -> Value {
                match at.and_then(|i| record.get(i)) {
                    Some(s) if !s.trim().is_empty() => Value::Text(s.to_string()),
                    _ => Value::Null,
                }
            };
            raw_rows.push(RawRow {
                site: field(site_at),
                sensor: field(sensor_at),
                timestamp: field(timestamp_at),
                area: field(area_at),
                ndwi_area: field(ndwi_at),
                flags: flags_at.iter().map(|at| field(*at)).collect(),
            });
        }
        self.insert_rows(raw_rows)
    }

    fn insert_rows(&self, raw_rows: Vec<RawRow>) -> anyhow::Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO observations
                 (site_id, sensor_id, sensor_class, date, area_km2, ndwi_area_km2, flagged)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for raw in raw_rows {
                let Some(site_id) = site_text(&raw.site) else {
                    report.skipped_missing_site += 1;
                    continue;
                };
                let date = match timestamp_date(&raw.timestamp) {
                    Ok(date) => date,
                    Err(e) => {
                        log::debug!("[WSD] loader: site {}: {}", site_id, e);
                        report.skipped_bad_timestamp += 1;
                        continue;
                    }
                };
                let sensor_id = sensor_text(&raw.sensor);
                let sensor_class = SensorClass::classify(sensor_id.as_deref(), self.radar_sensor());
                let flagged = !raw.flags.is_empty() && !raw.flags.iter().any(flag_is_clear);

                stmt.execute(params![
                    site_id,
                    sensor_id,
                    sensor_class.map(|c| c.as_str()),
                    date,
                    number(&raw.area),
                    number(&raw.ndwi_area),
                    flagged,
                ])?;
                report.imported += 1;
            }
        }
        tx.commit()?;

        if report.skipped() > 0 {
            log::warn!("[WSD] loader: {}", report);
        } else {
            log::info!("[WSD] loader: {}", report);
        }
        Ok(report)
    }
}

fn site_text(value: &Value) -> Option<String> {
    match value {
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("{}", *f as i64)),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn sensor_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn timestamp_date(value: &Value) -> Result<NaiveDate, DateError> {
    match value {
        Value::Text(s) => parse_timestamp(s),
        Value::Integer(secs) => date_from_unix_seconds(*secs),
        Value::Real(secs) => date_from_unix_seconds(secs.floor() as i64),
        Value::Null => Err(DateError("missing timestamp".to_string())),
        Value::Blob(_) => Err(DateError("binary timestamp".to_string())),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(f) if f.is_finite() => Some(*f),
        Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn flag_is_clear(value: &Value) -> bool {
    match value {
        Value::Integer(i) => *i == 0,
        Value::Real(f) => *f == 0.0,
        Value::Text(s) => {
            let s = s.trim();
            s == "0" || s.eq_ignore_ascii_case("false") || s.parse::<f64>().is_ok_and(|f| f == 0.0)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use rusqlite::Connection;

    fn count(db: &Database, sql: &str) -> i64 {
        let conn = db.conn().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn load_csv_with_original_headers() {
        let db = Database::new().unwrap();
        let csv = "\
loc,sat_id,time,area_km2,ndwi_area_km2,error,error_vis
10,S1_GRD,2020-01-01 00:00:00,5.0,,0,1
10,LANDSAT/LC08,2020-02-01 00:00:00,5.5,5.2,1,0
11,LANDSAT/LC08,2020-02-01 00:00:00,2.0,2.1,1,1
";
        let report = db.load_csv(csv).unwrap();
        assert_eq!(report.imported, 3);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM observations"), 3);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM observations WHERE flagged = 1"), 1);
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM observations WHERE sensor_class = 'radar'"),
            1
        );
    }

    #[test]
    fn load_csv_with_synonym_headers() {
        let db = Database::new().unwrap();
        let csv = "\
site_id,sensor_id,timestamp,classified_area_km2
10,S1_GRD,2020-01-01,5.0
";
        let report = db.load_csv(csv).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM observations WHERE flagged = 0"),
            1,
            "no flag columns means nothing is flagged"
        );
    }

    #[test]
    fn missing_area_is_retained_as_null() {
        let db = Database::new().unwrap();
        let csv = "\
loc,sat_id,time,area_km2,ndwi_area_km2
10,LANDSAT/LC08,2020-02-01,,5.2
10,LANDSAT/LC08,2020-03-01,n/a,5.4
";
        let report = db.load_csv(csv).unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM observations WHERE area_km2 IS NULL"),
            2
        );
    }

    #[test]
    fn bad_timestamps_and_empty_sites_are_skipped() {
        let db = Database::new().unwrap();
        let csv = "\
loc,sat_id,time,area_km2
10,S1_GRD,2020-01-01,1.0
10,S1_GRD,yesterday,1.0
,S1_GRD,2020-01-02,1.0
";
        let report = db.load_csv(csv).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped_bad_timestamp, 1);
        assert_eq!(report.skipped_missing_site, 1);
    }

    #[test]
    fn missing_sensor_has_no_class() {
        let db = Database::new().unwrap();
        db.load_csv("loc,sat_id,time,area_km2\n10,,2020-01-01,1.0\n")
            .unwrap();
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM observations WHERE sensor_class IS NULL AND sensor_id IS NULL"),
            1
        );
    }

    #[test]
    fn custom_radar_sentinel() {
        let db = Database::with_radar_sensor("SENTINEL1").unwrap();
        db.load_csv("loc,sat_id,time,area_km2\n10,SENTINEL1,2020-01-01,1.0\n10,S1_GRD,2020-01-01,1.0\n")
            .unwrap();
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM observations WHERE sensor_class = 'radar'"),
            1
        );
    }

    #[test]
    fn import_table_normalizes_types() {
        let source = Connection::open_in_memory().unwrap();
        source
            .execute_batch(
                "CREATE TABLE measurements (
                    loc REAL, sat_id TEXT, timestamp INTEGER, area_km2 TEXT, error TEXT);
                 INSERT INTO measurements VALUES
                    (1262.0, 'S1_GRD', 1577836800, '5.0', 'false'),
                    (1262.0, 'S1_GRD', 1580515200, '6.0', NULL);",
            )
            .unwrap();
        let db = Database::new().unwrap();
        let report = db.import_table(&source, "measurements").unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM observations WHERE site_id = '1262' AND date = '2020-01-01'"),
            1
        );
        assert_eq!(count(&db, "SELECT COUNT(*) FROM observations WHERE flagged = 1"), 1);
    }
}
