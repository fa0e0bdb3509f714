//! In-memory index over the static schedule.
//!
//! Built once from the raw tables and immutable afterwards. Every lookup the
//! aggregation layer needs is a hash lookup instead of a table scan.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use super::error::GtfsError;
use super::loader::GtfsTables;
use super::types::{LatLng, Route, RouteShape, ShapePoint, Stop, StopTime, Trip};

/// Stop id → ids of every route with a trip calling there.
pub type StationRouteMap = HashMap<String, BTreeSet<String>>;

/// Indexed static schedule.
#[derive(Debug, Default)]
pub struct StaticIndex {
    stops: Vec<Stop>,
    routes: Vec<Route>,
    trips: Vec<Trip>,
    stop_times: Vec<StopTime>,

    stop_by_id: HashMap<String, usize>,
    route_by_id: HashMap<String, usize>,
    trip_by_id: HashMap<String, usize>,

    /// Trip indices per route, in table order.
    trips_by_route: HashMap<String, Vec<usize>>,
    /// Points per shape, sorted by sequence.
    shapes: HashMap<String, Vec<ShapePoint>>,
    /// Stop-time indices per trip, sorted by stop sequence.
    stop_times_by_trip: HashMap<String, Vec<usize>>,
    /// Stop-time indices per stop, in table order.
    stop_times_by_stop: HashMap<String, Vec<usize>>,
}

impl StaticIndex {
    /// Load the tables in `dir` and index them.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, GtfsError> {
        Ok(Self::from_tables(GtfsTables::load(dir)?))
    }

    /// Index already-loaded tables.
    pub fn from_tables(tables: GtfsTables) -> Self {
        let GtfsTables {
            stops,
            routes,
            trips,
            shapes: shape_points,
            stop_times,
        } = tables;

        // First row wins on duplicate ids.
        let mut stop_by_id = HashMap::with_capacity(stops.len());
        for (idx, stop) in stops.iter().enumerate() {
            stop_by_id.entry(stop.id.clone()).or_insert(idx);
        }

        let mut route_by_id = HashMap::with_capacity(routes.len());
        for (idx, route) in routes.iter().enumerate() {
            route_by_id.entry(route.id.clone()).or_insert(idx);
        }

        let mut trip_by_id = HashMap::with_capacity(trips.len());
        let mut trips_by_route: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, trip) in trips.iter().enumerate() {
            trip_by_id.entry(trip.id.clone()).or_insert(idx);
            trips_by_route
                .entry(trip.route_id.clone())
                .or_default()
                .push(idx);
        }

        let mut shapes: HashMap<String, Vec<ShapePoint>> = HashMap::new();
        for point in shape_points {
            shapes.entry(point.shape_id.clone()).or_default().push(point);
        }
        for points in shapes.values_mut() {
            points.sort_by_key(|p| p.sequence);
        }

        let mut stop_times_by_trip: HashMap<String, Vec<usize>> = HashMap::new();
        let mut stop_times_by_stop: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, st) in stop_times.iter().enumerate() {
            stop_times_by_trip
                .entry(st.trip_id.clone())
                .or_default()
                .push(idx);
            stop_times_by_stop
                .entry(st.stop_id.clone())
                .or_default()
                .push(idx);
        }
        for indices in stop_times_by_trip.values_mut() {
            indices.sort_by_key(|&i| stop_times[i].stop_sequence);
        }

        Self {
            stops,
            routes,
            trips,
            stop_times,
            stop_by_id,
            route_by_id,
            trip_by_id,
            trips_by_route,
            shapes,
            stop_times_by_trip,
            stop_times_by_stop,
        }
    }

    /// All stop rows that are stations, in table order.
    pub fn stations(&self) -> Vec<Stop> {
        self.stops.iter().filter(|s| s.is_station()).cloned().collect()
    }

    /// All routes, in table order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Look up any stop row, station or not.
    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stop_by_id.get(stop_id).map(|&i| &self.stops[i])
    }

    pub fn route(&self, route_id: &str) -> Option<&Route> {
        self.route_by_id.get(route_id).map(|&i| &self.routes[i])
    }

    pub fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.trip_by_id.get(trip_id).map(|&i| &self.trips[i])
    }

    /// Trips of a route, in table order.
    pub(super) fn trips_for_route<'a>(&'a self, route_id: &str) -> impl Iterator<Item = &'a Trip> {
        self.trips_by_route
            .get(route_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.trips[i])
    }

    /// Stop-times at a stop, in table order.
    pub(super) fn stop_times_at<'a>(&'a self, stop_id: &str) -> impl Iterator<Item = &'a StopTime> {
        self.stop_times_by_stop
            .get(stop_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.stop_times[i])
    }

    /// Stop-times of a trip, ordered by stop sequence.
    fn stop_times_for_trip<'a>(&'a self, trip_id: &str) -> impl Iterator<Item = &'a StopTime> {
        self.stop_times_by_trip
            .get(trip_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.stop_times[i])
    }

    /// Join stop-times to trips to find the routes serving each stop.
    ///
    /// Stop-times referencing unknown trips are skipped.
    pub fn station_route_map(&self) -> StationRouteMap {
        let mut map = StationRouteMap::new();
        for (stop_id, indices) in &self.stop_times_by_stop {
            let trip_ids: HashSet<&str> = indices
                .iter()
                .map(|&i| self.stop_times[i].trip_id.as_str())
                .collect();

            let routes: BTreeSet<String> = trip_ids
                .into_iter()
                .filter_map(|trip_id| self.trip(trip_id))
                .map(|trip| trip.route_id.clone())
                .collect();

            map.insert(stop_id.clone(), routes);
        }
        map
    }

    /// Shapes reachable from a route through its trips.
    ///
    /// Shapes come out in the order their id is first seen in the trip
    /// table. A shape id with no points yields an empty polyline.
    pub fn shapes_for_route(&self, route_id: &str) -> Result<Vec<RouteShape>, GtfsError> {
        let mut seen = HashSet::new();
        let shapes: Vec<RouteShape> = self
            .trips_for_route(route_id)
            .map(|trip| trip.shape_id.as_str())
            .filter(|shape_id| !shape_id.is_empty() && seen.insert(*shape_id))
            .map(|shape_id| RouteShape {
                shape_id: shape_id.to_string(),
                coordinates: self.shape_coordinates(shape_id),
            })
            .collect();

        if shapes.is_empty() {
            return Err(GtfsError::NotFound(format!(
                "No shapes found for route: {route_id}"
            )));
        }
        Ok(shapes)
    }

    fn shape_coordinates(&self, shape_id: &str) -> Vec<LatLng> {
        self.shapes
            .get(shape_id)
            .map(|points| {
                points
                    .iter()
                    .map(|p| LatLng {
                        lat: p.lat,
                        lng: p.lng,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pick the trip that stands in for a route's stop pattern.
    ///
    /// The first trip with `direction_id == "0"`, otherwise the first trip in
    /// table order.
    pub fn representative_trip(&self, route_id: &str) -> Option<&Trip> {
        self.trips_for_route(route_id)
            .find(|trip| trip.direction_id == "0")
            .or_else(|| self.trips_for_route(route_id).next())
    }

    /// Ordered stops of a route's representative trip.
    ///
    /// Stop-times pointing at unknown stops are skipped.
    pub fn stops_for_route(&self, route_id: &str) -> Result<Vec<Stop>, GtfsError> {
        let trip = self.representative_trip(route_id).ok_or_else(|| {
            GtfsError::NotFound(format!("No trips found for route: {route_id}"))
        })?;

        Ok(self
            .stop_times_for_trip(&trip.id)
            .filter_map(|st| self.stop(&st.stop_id))
            .cloned()
            .collect())
    }

    /// Polyline for drawing a route.
    ///
    /// Uses the first shape encountered for the route, which is not
    /// necessarily the longest or most common one. Without shape points,
    /// falls back to the representative trip's stop coordinates.
    pub fn line_geometry(&self, route_id: &str) -> Result<Vec<LatLng>, GtfsError> {
        let from_shape = self
            .trips_for_route(route_id)
            .find(|trip| !trip.shape_id.is_empty())
            .map(|trip| self.shape_coordinates(&trip.shape_id))
            .unwrap_or_default();

        if !from_shape.is_empty() {
            return Ok(from_shape);
        }

        let from_stops = self
            .stops_for_route(route_id)
            .map(|stops| stops.iter().map(Stop::coordinate).collect::<Vec<_>>())
            .unwrap_or_default();

        if from_stops.is_empty() {
            return Err(GtfsError::NotFound(format!(
                "No data found for line {route_id}"
            )));
        }
        Ok(from_stops)
    }
}
