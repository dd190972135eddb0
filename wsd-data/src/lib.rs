//! Site catalog join and per-site aggregates for water surface detection data.
//!
//! Every function here is a pure transformation of already-filtered
//! observations (and the geometry index, for the catalog). Nothing is cached;
//! calling again with the same inputs produces the same output.

pub mod catalog;
pub mod comparison;
pub mod stats;

/// Per-sensor time series for one site.
pub mod series {
    use chrono::NaiveDate;
    use serde::Serialize;
    use wsd_core::observation::Observation;

    /// A single dated value on a chart line.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct SeriesPoint {
        pub date: NaiveDate,
        pub value: f64,
        pub sensor_id: Option<String>,
    }

    /// The three lines of the time series chart.
    ///
    /// `radar` and `optical` carry classified area; `ndwi` carries the
    /// index-derived area of optical rows. Rows without a value for a line
    /// are simply absent from it.
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct SiteSeries {
        pub radar: Vec<SeriesPoint>,
        pub optical: Vec<SeriesPoint>,
        pub ndwi: Vec<SeriesPoint>,
    }

    impl SiteSeries {
        pub fn is_empty(&self) -> bool {
            self.radar.is_empty() && self.optical.is_empty() && self.ndwi.is_empty()
        }
    }

    /// Split date-ordered observations into chart lines, keeping their order.
    pub fn build_series(observations: &[Observation]) -> SiteSeries {
        let mut series = SiteSeries::default();
        for obs in observations {
            let point = |value: f64| SeriesPoint {
                date: obs.date,
                value,
                sensor_id: obs.sensor_id.clone(),
            };
            if obs.is_radar() {
                if let Some(area) = obs.area_km2 {
                    series.radar.push(point(area));
                }
            } else if obs.is_optical() {
                if let Some(area) = obs.area_km2 {
                    series.optical.push(point(area));
                }
                if let Some(ndwi) = obs.ndwi_area_km2 {
                    series.ndwi.push(point(ndwi));
                }
            }
        }
        series
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use wsd_core::observation::SensorClass;
        use wsd_core::site::SiteId;

        fn obs(day: u32, class: Option<SensorClass>, area: Option<f64>, ndwi: Option<f64>) -> Observation {
            Observation {
                site_id: SiteId::from("10"),
                sensor_id: class.map(|c| match c {
                    SensorClass::Radar => "S1_GRD".to_string(),
                    SensorClass::Optical => "LANDSAT/LC08".to_string(),
                }),
                sensor_class: class,
                date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
                area_km2: area,
                ndwi_area_km2: ndwi,
                flagged: false,
            }
        }

        #[test]
        fn splits_by_sensor_class() {
            let rows = vec![
                obs(1, Some(SensorClass::Radar), Some(5.0), None),
                obs(2, Some(SensorClass::Optical), Some(5.5), Some(5.2)),
                obs(3, None, Some(1.0), Some(1.0)),
            ];
            let series = build_series(&rows);
            assert_eq!(series.radar.len(), 1);
            assert_eq!(series.optical.len(), 1);
            assert_eq!(series.ndwi.len(), 1);
            assert_eq!(series.ndwi[0].value, 5.2);
        }

        #[test]
        fn ndwi_only_rows_still_plot() {
            let rows = vec![obs(4, Some(SensorClass::Optical), None, Some(3.3))];
            let series = build_series(&rows);
            assert!(series.optical.is_empty());
            assert_eq!(series.ndwi.len(), 1);
            assert!(!series.is_empty());
        }
    }
}

/// Mean area per calendar month.
pub mod monthly {
    use chrono::Datelike;
    use serde::Serialize;
    use std::collections::BTreeMap;
    use wsd_core::observation::Observation;
    use wsd_utils::dates::month_name;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct MonthlyMean {
        /// 1 = January
        pub month: u32,
        pub label: &'static str,
        pub mean: f64,
        pub count: usize,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct MonthlyMeans {
        pub radar: Vec<MonthlyMean>,
        pub optical: Vec<MonthlyMean>,
        pub ndwi: Vec<MonthlyMean>,
    }

    impl MonthlyMeans {
        pub fn is_empty(&self) -> bool {
            self.radar.is_empty() && self.optical.is_empty() && self.ndwi.is_empty()
        }
    }

    #[derive(Default)]
    struct Accumulator(BTreeMap<u32, (f64, usize)>);

    impl Accumulator {
        fn add(&mut self, month: u32, value: Option<f64>) {
            if let Some(v) = value {
                let slot = self.0.entry(month).or_insert((0.0, 0));
                slot.0 += v;
                slot.1 += 1;
            }
        }

        fn finish(self) -> Vec<MonthlyMean> {
            self.0
                .into_iter()
                .filter_map(|(month, (sum, count))| {
                    Some(MonthlyMean {
                        month,
                        label: month_name(month)?,
                        mean: sum / count as f64,
                        count,
                    })
                })
                .collect()
        }
    }

    /// Group observations by calendar month across years. Only months with
    /// at least one value appear in a series.
    pub fn monthly_means(observations: &[Observation]) -> MonthlyMeans {
        let mut radar = Accumulator::default();
        let mut optical = Accumulator::default();
        let mut ndwi = Accumulator::default();

        for obs in observations {
            let month = obs.date.month();
            if obs.is_radar() {
                radar.add(month, obs.area_km2);
            } else if obs.is_optical() {
                optical.add(month, obs.area_km2);
                ndwi.add(month, obs.ndwi_area_km2);
            }
        }

        MonthlyMeans {
            radar: radar.finish(),
            optical: optical.finish(),
            ndwi: ndwi.finish(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;
        use wsd_core::observation::SensorClass;
        use wsd_core::site::SiteId;

        fn radar(y: i32, m: u32, area: f64) -> Observation {
            Observation {
                site_id: SiteId::from("10"),
                sensor_id: Some("S1_GRD".to_string()),
                sensor_class: Some(SensorClass::Radar),
                date: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
                area_km2: Some(area),
                ndwi_area_km2: None,
                flagged: false,
            }
        }

        #[test]
        fn averages_same_month_across_years() {
            let rows = vec![radar(2019, 3, 4.0), radar(2020, 3, 6.0), radar(2020, 7, 1.0)];
            let means = monthly_means(&rows);
            assert_eq!(means.radar.len(), 2);
            assert_eq!(means.radar[0].month, 3);
            assert_eq!(means.radar[0].label, "March");
            assert_eq!(means.radar[0].mean, 5.0);
            assert_eq!(means.radar[0].count, 2);
            assert!(means.optical.is_empty());
            assert!(means.ndwi.is_empty());
        }

        #[test]
        fn empty_input_has_no_months() {
            assert!(monthly_means(&[]).is_empty());
        }
    }
}
