use crate::site::SiteId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor id of the Sentinel-1 ground range detected product.
pub const RADAR_SENSOR_ID: &str = "S1_GRD";

/// Closed two-way classification of the sensor that produced a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorClass {
    /// Sentinel-1 SAR, all-weather
    Radar,
    /// Landsat and any other non-radar sensor
    Optical,
}

impl SensorClass {
    /// Classify a sensor id against the radar sentinel.
    ///
    /// Exact match means radar, any other non-null id is optical, and a null
    /// id belongs to neither series.
    pub fn classify(sensor_id: Option<&str>, radar_sentinel: &str) -> Option<SensorClass> {
        match sensor_id {
            Some(id) if id == radar_sentinel => Some(SensorClass::Radar),
            Some(_) => Some(SensorClass::Optical),
            None => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorClass::Radar => "radar",
            SensorClass::Optical => "optical",
        }
    }

    pub fn parse(s: &str) -> Option<SensorClass> {
        match s.trim().to_ascii_lowercase().as_str() {
            "radar" | "sentinel-1" | "s1" => Some(SensorClass::Radar),
            "optical" | "landsat" => Some(SensorClass::Optical),
            _ => None,
        }
    }
}

impl fmt::Display for SensorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measurement row after schema normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub site_id: SiteId,
    /// Raw sensor id as stored (e.g. `S1_GRD`, `LANDSAT/LC08`)
    pub sensor_id: Option<String>,
    pub sensor_class: Option<SensorClass>,
    pub date: NaiveDate,
    /// Classified water area in km²
    pub area_km2: Option<f64>,
    /// NDWI-derived water area in km²
    pub ndwi_area_km2: Option<f64>,
    pub flagged: bool,
}

impl Observation {
    pub fn is_radar(&self) -> bool {
        self.sensor_class == Some(SensorClass::Radar)
    }

    pub fn is_optical(&self) -> bool {
        self.sensor_class == Some(SensorClass::Optical)
    }
}
