//! Summary statistics for the per-site statistics cards.

use chrono::NaiveDate;
use serde::Serialize;
use wsd_core::observation::Observation;
use wsd_utils::dates::span_days;

/// Mean, max and min over a non-empty set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

impl Summary {
    /// `None` for an empty input, so callers never see a mean of zero
    /// standing in for "no data".
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Summary> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;
        for v in values {
            count += 1;
            sum += v;
            max = max.max(v);
            min = min.min(v);
        }
        (count > 0).then(|| Summary {
            count,
            mean: sum / count as f64,
            max,
            min,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteStats {
    pub total: usize,
    pub radar_count: usize,
    pub optical_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Inclusive day count between first and last date.
    pub span_days: Option<i64>,
    pub radar: Option<Summary>,
    pub optical: Option<Summary>,
    pub ndwi: Option<Summary>,
}

/// Compute the statistics cards for one site's filtered observations.
pub fn site_stats(observations: &[Observation]) -> SiteStats {
    let first_date = observations.iter().map(|o| o.date).min();
    let last_date = observations.iter().map(|o| o.date).max();
    let radar = observations.iter().filter(|o| o.is_radar());
    let optical = observations.iter().filter(|o| o.is_optical());

    SiteStats {
        total: observations.len(),
        radar_count: radar.clone().count(),
        optical_count: optical.clone().count(),
        first_date,
        last_date,
        span_days: first_date.zip(last_date).map(|(a, b)| span_days(&a, &b)),
        radar: Summary::of(radar.filter_map(|o| o.area_km2)),
        optical: Summary::of(optical.clone().filter_map(|o| o.area_km2)),
        ndwi: Summary::of(optical.filter_map(|o| o.ndwi_area_km2)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsd_core::observation::SensorClass;
    use wsd_core::site::SiteId;

    fn obs(m: u32, d: u32, class: SensorClass, area: Option<f64>, ndwi: Option<f64>) -> Observation {
        Observation {
            site_id: SiteId::from("10"),
            sensor_id: Some(match class {
                SensorClass::Radar => "S1_GRD".to_string(),
                SensorClass::Optical => "LANDSAT/LC08".to_string(),
            }),
            sensor_class: Some(class),
            date: NaiveDate::from_ymd_opt(2020, m, d).unwrap(),
            area_km2: area,
            ndwi_area_km2: ndwi,
            flagged: false,
        }
    }

    #[test]
    fn summary_of_empty_is_none() {
        assert_eq!(Summary::of(Vec::new()), None);
    }

    #[test]
    fn summary_of_values() {
        let s = Summary::of([2.0, 4.0, 9.0]).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.max, 9.0);
        assert_eq!(s.min, 2.0);
    }

    #[test]
    fn stats_for_mixed_site() {
        let rows = vec![
            obs(1, 1, SensorClass::Radar, Some(5.0), None),
            obs(2, 1, SensorClass::Optical, Some(5.5), Some(5.2)),
            obs(2, 17, SensorClass::Optical, None, Some(4.8)),
        ];
        let stats = site_stats(&rows);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.radar_count, 1);
        assert_eq!(stats.optical_count, 2);
        assert_eq!(stats.span_days, Some(48));
        assert_eq!(stats.radar.unwrap().mean, 5.0);
        assert_eq!(stats.optical.unwrap().count, 1);
        assert_eq!(stats.ndwi.unwrap().min, 4.8);
    }

    #[test]
    fn radar_only_site_has_no_optical_summary() {
        let stats = site_stats(&[obs(1, 1, SensorClass::Radar, Some(5.0), None)]);
        assert!(stats.optical.is_none());
        assert!(stats.ndwi.is_none());
        assert_eq!(stats.span_days, Some(1));
    }

    #[test]
    fn empty_site_has_no_dates() {
        let stats = site_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.first_date, None);
        assert_eq!(stats.span_days, None);
        assert!(stats.radar.is_none());
    }
}
