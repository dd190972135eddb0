//! Classified vs NDWI area comparison over a site's optical rows.

use chrono::NaiveDate;
use serde::Serialize;
use wsd_core::observation::Observation;

/// Five-number summary for a box plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl BoxStats {
    /// Quartiles use linear interpolation between closest ranks.
    pub fn of(values: &[f64]) -> Option<BoxStats> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        Some(BoxStats {
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub date: NaiveDate,
    pub ndwi: f64,
    pub classified: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub classified: Option<BoxStats>,
    pub ndwi: Option<BoxStats>,
    /// Rows carrying both areas.
    pub scatter: Vec<ScatterPoint>,
    /// Upper end of the 1:1 reference line.
    pub reference_max: f64,
}

/// Build the comparison view. `None` when the site has no optical rows
/// under the current filter.
pub fn compare(observations: &[Observation]) -> Option<Comparison> {
    let optical: Vec<&Observation> = observations.iter().filter(|o| o.is_optical()).collect();
    if optical.is_empty() {
        return None;
    }

    let classified: Vec<f64> = optical.iter().filter_map(|o| o.area_km2).collect();
    let ndwi: Vec<f64> = optical.iter().filter_map(|o| o.ndwi_area_km2).collect();
    let scatter: Vec<ScatterPoint> = optical
        .iter()
        .filter_map(|o| {
            Some(ScatterPoint {
                date: o.date,
                ndwi: o.ndwi_area_km2?,
                classified: o.area_km2?,
            })
        })
        .collect();
    let reference_max = classified
        .iter()
        .chain(ndwi.iter())
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    Some(Comparison {
        classified: BoxStats::of(&classified),
        ndwi: BoxStats::of(&ndwi),
        scatter,
        reference_max,
    })
}
