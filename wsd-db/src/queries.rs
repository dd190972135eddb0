//! Typed, filtered queries over the normalized observation table.
//!
//! Every query that returns observations takes the active
//! [`FilterState`] and pushes it into SQL. Results are always ordered by
//! date, then sensor id, then source order, so repeated calls with the same
//! filter return identical sequences.

use crate::models::{DateBounds, SensorCount};
use crate::Database;
use chrono::NaiveDate;
use rusqlite::params;
use wsd_core::filter::{FilterState, FlagPolicy};
use wsd_core::observation::{Observation, SensorClass};
use wsd_core::site::SiteId;

const OBSERVATION_QUERY: &str = "
    SELECT site_id, sensor_id, sensor_class, date, area_km2, ndwi_area_km2, flagged
    FROM observations
    WHERE (?1 IS NULL OR date >= ?1)
      AND (?2 IS NULL OR date <= ?2)
      AND (?3 = 1
           OR (?4 = 1 AND sensor_class = 'radar')
           OR (?5 = 1 AND sensor_class = 'optical'))
      AND (?6 = 1 OR flagged = 0)
      AND (?7 IS NULL OR site_id = ?7)
    ORDER BY date, sensor_id, row_id";

impl Database {
    /// All observations passing `filter`, ascending by date.
    pub fn query_observations(&self, filter: &FilterState) -> anyhow::Result<Vec<Observation>> {
        let rows = self.select_observations(filter, None)?;
        log::debug!(
            "[WSD] query: query_observations returned {} records",
            rows.len()
        );
        Ok(rows)
    }

    /// Observations of one site passing `filter`, ascending by date.
    pub fn query_site_observations(
        &self,
        site_id: &SiteId,
        filter: &FilterState,
    ) -> anyhow::Result<Vec<Observation>> {
        let rows = self.select_observations(filter, Some(site_id))?;
        log::debug!(
            "[WSD] query: query_site_observations({}) returned {} records",
            site_id,
            rows.len()
        );
        Ok(rows)
    }

    fn select_observations(
        &self,
        filter: &FilterState,
        site_id: Option<&SiteId>,
    ) -> anyhow::Result<Vec<Observation>> {
        let start = filter.date_range.map(|r| r.start());
        let end = filter.date_range.map(|r| r.end());
        let unrestricted = filter.sensors.is_unrestricted();
        let radar = filter.sensors.includes(SensorClass::Radar);
        let optical = filter.sensors.includes(SensorClass::Optical);
        let include_flagged = filter.flags == FlagPolicy::Include;

        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(OBSERVATION_QUERY)?;
        let rows = stmt
            .query_map(
                params![
                    start,
                    end,
                    unrestricted,
                    radar,
                    optical,
                    include_flagged,
                    site_id.map(|s| s.as_str()),
                ],
                |row| {
                    let site: String = row.get(0)?;
                    let class: Option<String> = row.get(2)?;
                    Ok(Observation {
                        site_id: SiteId::from(site),
                        sensor_id: row.get(1)?,
                        sensor_class: class.as_deref().and_then(SensorClass::parse),
                        date: row.get(3)?,
                        area_km2: row.get(4)?,
                        ndwi_area_km2: row.get(5)?,
                        flagged: row.get(6)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// First and last date over the whole store, ignoring any filter.
    ///
    /// `None` when the store is empty.
    pub fn query_date_bounds(&self) -> anyhow::Result<Option<DateBounds>> {
        let conn = self.conn()?;
        let (first, last): (Option<NaiveDate>, Option<NaiveDate>) = conn.query_row(
            "SELECT MIN(date), MAX(date) FROM observations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(first.zip(last).map(|(first, last)| DateBounds { first, last }))
    }

    /// Distinct site ids present in the store, in id order.
    pub fn query_site_ids(&self) -> anyhow::Result<Vec<SiteId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT site_id FROM observations")?;
        let mut ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(SiteId::from))
            .collect::<Result<Vec<_>, _>>()?;
        ids.sort();
        Ok(ids)
    }

    /// Row count per raw sensor id over the whole store.
    pub fn query_sensor_counts(&self) -> anyhow::Result<Vec<SensorCount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT sensor_id, COUNT(*) FROM observations
             GROUP BY sensor_id
             ORDER BY sensor_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SensorCount {
                    sensor_id: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Total number of stored rows, ignoring any filter.
    pub fn count_observations(&self) -> anyhow::Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
