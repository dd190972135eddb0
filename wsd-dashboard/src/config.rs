//! Resolved dashboard configuration.

use serde::Serialize;
use std::path::{Path, PathBuf};
use wsd_core::observation::RADAR_SENSOR_ID;
pub use wsd_db::schema::DEFAULT_TABLE;

pub const DEFAULT_DB_FILE: &str = "db_1.db";
pub const DEFAULT_GEOMETRY_DIR: &str = "geometries";
pub const DEFAULT_MODEL_FILE: &str = "model/feature_importance.json";
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

/// Where the dashboard reads its inputs from and where it listens.
///
/// All paths are absolute or already joined onto `root`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardConfig {
    pub root: PathBuf,
    pub db_path: PathBuf,
    pub table: String,
    pub geometry_dir: PathBuf,
    pub model_path: PathBuf,
    pub bind: String,
    pub radar_sensor: String,
}

impl DashboardConfig {
    /// Defaults for a data root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        DashboardConfig {
            db_path: root.join(DEFAULT_DB_FILE),
            table: DEFAULT_TABLE.to_string(),
            geometry_dir: root.join(DEFAULT_GEOMETRY_DIR),
            model_path: root.join(DEFAULT_MODEL_FILE),
            bind: DEFAULT_BIND.to_string(),
            radar_sensor: RADAR_SENSOR_ID.to_string(),
            root,
        }
    }

    /// Join a relative path onto `root`; absolute paths are kept.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
