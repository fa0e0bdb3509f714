//! Rows of the static schedule tables.
//!
//! Field names follow the GTFS column names on the way in and the short
//! record names (`id`, `name`, `lat`, `lng`, ...) on the way out.

use serde::{Deserialize, Serialize};

/// A row of `stops.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Stop {
    #[serde(rename(deserialize = "stop_id", serialize = "id"))]
    pub id: String,
    #[serde(rename(deserialize = "stop_name", serialize = "name"), default)]
    pub name: String,
    #[serde(rename(deserialize = "stop_lat", serialize = "lat"))]
    pub lat: f64,
    #[serde(rename(deserialize = "stop_lon", serialize = "lng"))]
    pub lng: f64,
    /// Empty when the column is missing or blank.
    #[serde(default)]
    pub location_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheelchair_boarding: Option<String>,
}

impl Stop {
    /// Stations are stops with `location_type` `"0"` or blank.
    /// Entrances, platforms and generic nodes are not.
    pub fn is_station(&self) -> bool {
        matches!(self.location_type.trim(), "" | "0")
    }

    pub fn coordinate(&self) -> LatLng {
        LatLng {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// A row of `routes.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Route {
    #[serde(rename(deserialize = "route_id", serialize = "id"))]
    pub id: String,
    #[serde(rename(deserialize = "route_short_name"), default)]
    pub short_name: String,
    #[serde(rename(deserialize = "route_long_name"), default)]
    pub long_name: String,
    #[serde(rename(deserialize = "route_color"), default)]
    pub color: String,
    #[serde(rename(deserialize = "route_text_color"), default)]
    pub text_color: String,
}

/// A row of `trips.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Trip {
    #[serde(rename(deserialize = "trip_id", serialize = "id"))]
    pub id: String,
    pub route_id: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub shape_id: String,
    #[serde(rename(deserialize = "trip_headsign"), default)]
    pub headsign: String,
    #[serde(default)]
    pub direction_id: String,
}

/// A row of `shapes.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShapePoint {
    pub shape_id: String,
    #[serde(rename = "shape_pt_lat")]
    pub lat: f64,
    #[serde(rename = "shape_pt_lon")]
    pub lng: f64,
    #[serde(rename = "shape_pt_sequence")]
    pub sequence: u32,
}

/// A row of `stop_times.txt`.
///
/// Times are kept as the raw `HH:MM:SS` strings. Trips running past midnight
/// use hours of 24 and above.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: String,
    #[serde(default)]
    pub arrival_time: String,
    #[serde(default)]
    pub departure_time: String,
    pub stop_sequence: u32,
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// One shape serving a route, as an ordered polyline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteShape {
    pub shape_id: String,
    pub coordinates: Vec<LatLng>,
}

/// A scheduled call at a station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub trip_id: String,
    pub route_id: String,
    pub trip_headsign: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub direction_id: String,
}
