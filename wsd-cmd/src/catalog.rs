//! `catalog` subcommand: the site catalog as CSV.

use std::io::Write;
use wsd_dashboard::params::FilterParams;
use wsd_dashboard::AppState;
use wsd_data::catalog::{build_catalog, SiteCatalog};

const HEADER: [&str; 9] = [
    "id",
    "name",
    "lat",
    "lon",
    "observations",
    "radar_observations",
    "optical_observations",
    "mean_area_km2",
    "max_area_km2",
];

/// Build the catalog under `params` and write it to `out`.
pub fn write_catalog(state: &AppState, params: &FilterParams, out: impl Write) -> anyhow::Result<()> {
    let filter = params.filter(state.dataset_span)?;
    let observations = state.db.query_observations(&filter)?;
    let catalog = build_catalog(&state.geometries, &observations);
    write_csv(&catalog, out)?;
    log::info!(
        "[WSD] catalog: wrote {} sites ({} filtered observations)",
        catalog.entries.len(),
        catalog.totals.observations
    );
    Ok(())
}

fn write_csv(catalog: &SiteCatalog, out: impl Write) -> anyhow::Result<()> {
    let optional = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_default();
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;
    for entry in &catalog.entries {
        writer.write_record([
            entry.id.to_string(),
            entry.name.clone(),
            format!("{:.6}", entry.centroid.lat),
            format!("{:.6}", entry.centroid.lon),
            entry.observation_count.to_string(),
            entry.radar_count.to_string(),
            entry.optical_count.to_string(),
            optional(entry.mean_area_km2),
            optional(entry.max_area_km2),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsd_core::geometry::GeometryIndex;
    use wsd_core::model_artifact::ModelAdapter;
    use wsd_core::site::{Bounds, Centroid, Site, SiteId, SourceEncoding};
    use wsd_db::Database;

    fn state() -> AppState {
        let db = Database::new().unwrap();
        let import = db
            .load_csv(
                "loc,sat_id,time,area_km2\n\
                 1262,S1_GRD,2020-01-01,5.0\n\
                 1262,LANDSAT/LC08,2020-02-01,7.0\n",
            )
            .unwrap();
        let site = |id: &str, name: &str| Site {
            id: SiteId::from(id),
            name: name.to_string(),
            centroid: Centroid { lat: -18.8, lon: -69.1 },
            bounds: Bounds {
                min_lon: -69.5,
                min_lat: -19.0,
                max_lon: -68.7,
                max_lat: -18.6,
            },
            encoding: SourceEncoding::Utf8,
        };
        let geometries = GeometryIndex::from_sites([
            site("1262", "Salar de Surire"),
            site("1263", "Salar de Huasco, Pica"),
        ]);
        AppState::from_parts(db, import, geometries, ModelAdapter::Absent).unwrap()
    }

    #[test]
    fn writes_one_row_per_site() {
        let mut out = Vec::new();
        write_catalog(&state(), &FilterParams::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,name,lat,lon"));
        assert_eq!(
            lines[1],
            "1262,Salar de Surire,-18.800000,-69.100000,2,1,1,6.0000,7.0000"
        );
        assert_eq!(
            lines[2],
            "1263,\"Salar de Huasco, Pica\",-18.800000,-69.100000,0,0,0,,"
        );
    }

    #[test]
    fn honours_filter() {
        let params = FilterParams {
            sensors: Some("radar".to_string()),
            ..Default::default()
        };
        let mut out = Vec::new();
        write_catalog(&state(), &params, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1262,Salar de Surire,-18.800000,-69.100000,1,1,0,5.0000,5.0000"));
    }
}
