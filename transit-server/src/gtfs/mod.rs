//! Static schedule index.
//!
//! Loads the GTFS reference tables (stops, routes, trips, shapes,
//! stop-times) once and answers the joins the aggregation layer needs:
//!
//! - station → routes serving it
//! - route → shapes, ordered stops, drawable polyline
//! - station → upcoming scheduled calls
//!
//! The index is immutable after construction. Reloading builds a new one.

mod error;
mod index;
mod loader;
mod schedule;
mod types;

pub use error::GtfsError;
pub use index::{StaticIndex, StationRouteMap};
pub use loader::GtfsTables;
pub use schedule::{
    MAX_PER_ROUTE, MAX_ROUTE_ENTRIES, MAX_STATION_ENTRIES, RouteSchedule, StationSchedule,
};
pub use types::{LatLng, Route, RouteShape, ScheduleEntry, ShapePoint, Stop, StopTime, Trip};

#[cfg(test)]
pub(crate) use index::fixtures;
