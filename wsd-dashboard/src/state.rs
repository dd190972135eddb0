//! Application state shared by every request handler.
//!
//! `AppState` is built once at startup and is read-only afterwards. It holds
//! no filter; each request carries its own, so concurrent sessions never see
//! each other's selections.

use crate::config::DashboardConfig;
use anyhow::Context;
use serde::Serialize;
use std::fmt;
use wsd_core::geometry::{load_geometry_dir, GeometryIndex, GeometryWarning};
use wsd_core::model_artifact::ModelAdapter;
use wsd_core::site::SiteId;
use wsd_db::models::{DateBounds, ImportReport};
use wsd_db::Database;

/// A non-blocking problem found while loading.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    Geometry(GeometryWarning),
    /// Site has observations but no boundary file, so it is not mapped.
    MissingGeometry(SiteId),
    SkippedRows(ImportReport),
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::Geometry(w) => write!(f, "{}", w),
            LoadWarning::MissingGeometry(id) => {
                write!(f, "site {} has observations but no boundary file", id)
            }
            LoadWarning::SkippedRows(report) => write!(
                f,
                "{} rows skipped ({} without site id, {} with unparseable timestamps)",
                report.skipped(),
                report.skipped_missing_site,
                report.skipped_bad_timestamp
            ),
        }
    }
}

impl Serialize for LoadWarning {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Summary of a completed load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub import: ImportReport,
    pub sites: usize,
    pub warnings: Vec<LoadWarning>,
}

pub struct AppState {
    pub db: Database,
    pub geometries: GeometryIndex,
    pub model: ModelAdapter,
    /// Full extent of the stored data, ignoring any filter.
    pub dataset_span: Option<DateBounds>,
    pub report: LoadReport,
}

impl AppState {
    /// Load the observation store, the boundary directory and the optional
    /// model artifact.
    ///
    /// A missing or unreadable store or geometry directory is fatal. Every
    /// per-item problem ends up in `report.warnings` instead.
    pub fn load(config: &DashboardConfig) -> anyhow::Result<AppState> {
        log::info!("[WSD] state: loading dashboard data with {:?}", config);

        let (db, import) = Database::open_backing(&config.db_path, &config.table, &config.radar_sensor)?;
        let geometries = load_geometry_dir(&config.geometry_dir)
            .context("boundary geometries are required for the map")?;
        let model = ModelAdapter::load(&config.model_path);

        Self::from_parts(db, import, geometries, model)
    }

    /// Assemble state from already-loaded parts and collect load warnings.
    pub fn from_parts(
        db: Database,
        import: ImportReport,
        geometries: GeometryIndex,
        model: ModelAdapter,
    ) -> anyhow::Result<AppState> {
        let mut warnings: Vec<LoadWarning> = geometries
            .warnings()
            .iter()
            .cloned()
            .map(LoadWarning::Geometry)
            .collect();

        if import.skipped() > 0 {
            let warning = LoadWarning::SkippedRows(import.clone());
            log::warn!("[WSD] state: {}", warning);
            warnings.push(warning);
        }

        for id in db.query_site_ids()? {
            if !geometries.contains(&id) {
                let warning = LoadWarning::MissingGeometry(id);
                log::warn!("[WSD] state: {}", warning);
                warnings.push(warning);
            }
        }

        for sensor in db.query_sensor_counts()? {
            log::info!(
                "[WSD] state: sensor {} -> {} rows",
                sensor.sensor_id.as_deref().unwrap_or("<none>"),
                sensor.count
            );
        }

        let dataset_span = db.query_date_bounds()?;
        let report = LoadReport {
            import,
            sites: geometries.len(),
            warnings,
        };
        log::info!(
            "[WSD] state: {} observations, {} sites, {} warnings",
            report.import.imported,
            report.sites,
            report.warnings.len()
        );

        Ok(AppState {
            db,
            geometries,
            model,
            dataset_span,
            report,
        })
    }
}
