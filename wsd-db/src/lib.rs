//! SQLite observation store for water surface detection data.
//!
//! The backing measurements table is opened read-only once, its column
//! names are normalized (see [`schema::ColumnMap`]) and every row is copied
//! into an in-memory SQLite table with one canonical shape. All filtering
//! then happens through typed query methods on [`Database`].
//!
//! # Usage
//!
//! ```rust
//! use wsd_db::Database;
//! use wsd_core::filter::FilterState;
//!
//! let db = Database::new().unwrap();
//! db.load_csv("loc,sat_id,time,area_km2\n10,S1_GRD,2020-01-01,5.0\n").unwrap();
//!
//! let rows = db.query_observations(&FilterState::default()).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.

pub mod schema;
mod loader;
mod queries;
pub mod models;

use anyhow::Context;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use wsd_core::observation::RADAR_SENSOR_ID;

use crate::models::ImportReport;

/// In-memory SQLite store of normalized observations.
///
/// Cheaply cloneable (via `Arc`) and shareable across request handlers.
/// The connection is behind a `Mutex` because `rusqlite::Connection` is
/// `Send` but not `Sync`.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    radar_sensor: Arc<str>,
}

impl Database {
    /// Create a new in-memory database with the schema applied and the
    /// default radar sentinel (`S1_GRD`).
    pub fn new() -> anyhow::Result<Self> {
        Self::with_radar_sensor(RADAR_SENSOR_ID)
    }

    /// Create an empty store that classifies `radar_sensor` as radar.
    pub fn with_radar_sensor(radar_sensor: &str) -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            radar_sensor: Arc::from(radar_sensor),
        })
    }

    /// Open the backing SQLite file read-only and import `table`.
    ///
    /// Any failure here (missing file, missing table, missing required
    /// columns) is fatal to the load.
    pub fn open_backing(
        path: &Path,
        table: &str,
        radar_sensor: &str,
    ) -> anyhow::Result<(Self, ImportReport)> {
        if !path.is_file() {
            anyhow::bail!("backing database {} not found", path.display());
        }
        let source = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open backing database {}", path.display()))?;

        let db = Self::with_radar_sensor(radar_sensor)?;
        let report = db
            .import_table(&source, table)
            .with_context(|| format!("failed to read table '{}' from {}", table, path.display()))?;
        Ok((db, report))
    }

    pub fn radar_sensor(&self) -> &str {
        &self.radar_sensor
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("observation store lock poisoned"))
    }
}
