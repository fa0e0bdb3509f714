//! Reads the static schedule tables from a GTFS directory.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::GtfsError;
use super::types::{Route, ShapePoint, Stop, StopTime, Trip};

/// The raw tables, in file order.
#[derive(Debug, Clone, Default)]
pub struct GtfsTables {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub shapes: Vec<ShapePoint>,
    pub stop_times: Vec<StopTime>,
}

impl GtfsTables {
    /// Load all tables from `dir`.
    ///
    /// `stops.txt`, `routes.txt`, `trips.txt` and `stop_times.txt` are
    /// required. `shapes.txt` is optional; without it no route has a shape.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, GtfsError> {
        let dir = dir.as_ref();

        let tables = Self {
            stops: read_table(dir, "stops.txt")?,
            routes: read_table(dir, "routes.txt")?,
            trips: read_table(dir, "trips.txt")?,
            shapes: read_optional_table(dir, "shapes.txt")?.unwrap_or_default(),
            stop_times: read_table(dir, "stop_times.txt")?,
        };

        info!(
            dir = %dir.display(),
            stops = tables.stops.len(),
            routes = tables.routes.len(),
            trips = tables.trips.len(),
            shape_points = tables.shapes.len(),
            stop_times = tables.stop_times.len(),
            "loaded static schedule"
        );

        Ok(tables)
    }
}

fn read_table<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, GtfsError> {
    read_optional_table(dir, file)?.ok_or_else(|| GtfsError::MissingTable {
        path: dir.join(file).display().to_string(),
    })
}

fn read_optional_table<T: DeserializeOwned>(
    dir: &Path,
    file: &str,
) -> Result<Option<Vec<T>>, GtfsError> {
    let path = dir.join(file);
    if !path.is_file() {
        debug!(path = %path.display(), "table absent");
        return Ok(None);
    }

    let csv_error = |e: csv::Error| GtfsError::Csv {
        file: file.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(csv_error)?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_error)?;

    Ok(Some(rows))
}
