//! Command implementations for the WSD CLI.
//!
//! `serve` loads the observation store and boundary geometries and starts
//! the dashboard; `catalog` prints the site catalog as CSV.

use clap::{Args, Subcommand};
use std::path::PathBuf;
use wsd_dashboard::config::{
    DashboardConfig, DEFAULT_BIND, DEFAULT_DB_FILE, DEFAULT_GEOMETRY_DIR, DEFAULT_MODEL_FILE,
};
use wsd_dashboard::params::FilterParams;

pub mod catalog;

/// Where the data lives. Relative paths resolve against `--root`.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Data root directory (defaults to the working directory)
    #[arg(long, env = "WSD_ROOT")]
    pub root: Option<PathBuf>,

    /// SQLite file holding the measurements table
    #[arg(long, env = "WSD_DB", default_value = DEFAULT_DB_FILE)]
    pub db: PathBuf,

    /// Measurements table name
    #[arg(long, env = "WSD_TABLE", default_value = wsd_dashboard::config::DEFAULT_TABLE)]
    pub table: String,

    /// Directory of `<site_id>.geojson` boundary files
    #[arg(long, env = "WSD_GEOMETRIES", default_value = DEFAULT_GEOMETRY_DIR)]
    pub geometries: PathBuf,

    /// Optional feature-importance artifact
    #[arg(long, env = "WSD_MODEL", default_value = DEFAULT_MODEL_FILE)]
    pub model: PathBuf,

    /// Sensor id classified as radar; every other id is optical
    #[arg(long, env = "WSD_RADAR_SENSOR", default_value = wsd_core::observation::RADAR_SENSOR_ID)]
    pub radar_sensor: String,
}

impl DataArgs {
    pub fn into_config(self, bind: String) -> anyhow::Result<DashboardConfig> {
        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let mut config = DashboardConfig::with_root(root);
        config.db_path = config.resolve(&self.db);
        config.geometry_dir = config.resolve(&self.geometries);
        config.model_path = config.resolve(&self.model);
        config.table = self.table;
        config.radar_sensor = self.radar_sensor;
        config.bind = bind;
        Ok(config)
    }
}

/// Filter flags for one-shot commands, same semantics as the dashboard's
/// query parameters.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// `all`, `radar`, `optical` or `radar,optical`
    #[arg(long)]
    pub sensors: Option<String>,

    /// Keep rows carrying an error flag
    #[arg(long)]
    pub include_flagged: bool,
}

impl From<FilterArgs> for FilterParams {
    fn from(args: FilterArgs) -> Self {
        FilterParams {
            start: args.start,
            end: args.end,
            sensors: args.sensors,
            include_flagged: Some(args.include_flagged),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the dashboard server
    Serve {
        #[command(flatten)]
        data: DataArgs,

        /// Address to listen on
        #[arg(long, env = "WSD_BIND", default_value = DEFAULT_BIND)]
        bind: String,
    },

    /// Print the site catalog as CSV to stdout
    Catalog {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve { data, bind } => {
            let config = data.into_config(bind)?;
            let state = wsd_dashboard::AppState::load(&config)?;
            wsd_dashboard::serve(state, &config).await
        }
        Command::Catalog { data, filter } => {
            let config = data.into_config(DEFAULT_BIND.to_string())?;
            let state = wsd_dashboard::AppState::load(&config)?;
            catalog::write_catalog(&state, &filter.into(), std::io::stdout().lock())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Command,
    }

    #[test]
    fn serve_defaults() {
        let cli = TestCli::try_parse_from(["wsd-cli", "serve", "--root", "/data"]).unwrap();
        let Command::Serve { data, bind } = cli.command else {
            panic!("expected serve");
        };
        let config = data.into_config(bind).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/db_1.db"));
        assert_eq!(config.geometry_dir, PathBuf::from("/data/geometries"));
        assert_eq!(config.table, "water_surface_detection_v3");
        assert_eq!(config.bind, "127.0.0.1:8501");
    }

    #[test]
    fn overrides_resolve_against_root() {
        let cli = TestCli::try_parse_from([
            "wsd-cli",
            "serve",
            "--root",
            "/data",
            "--db",
            "v4/db_2.db",
            "--geometries",
            "/shapes",
            "--radar-sensor",
            "S1A",
            "--bind",
            "0.0.0.0:9000",
        ])
        .unwrap();
        let Command::Serve { data, bind } = cli.command else {
            panic!("expected serve");
        };
        let config = data.into_config(bind).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/v4/db_2.db"));
        assert_eq!(config.geometry_dir, PathBuf::from("/shapes"));
        assert_eq!(config.radar_sensor, "S1A");
        assert_eq!(config.bind, "0.0.0.0:9000");
    }

    #[test]
    fn catalog_accepts_filter_flags() {
        let cli = TestCli::try_parse_from([
            "wsd-cli",
            "catalog",
            "--root",
            "/data",
            "--sensors",
            "radar",
            "--include-flagged",
        ])
        .unwrap();
        let Command::Catalog { filter, .. } = cli.command else {
            panic!("expected catalog");
        };
        let params: FilterParams = filter.into();
        assert_eq!(params.sensors.as_deref(), Some("radar"));
        assert_eq!(params.include_flagged, Some(true));
    }
}
