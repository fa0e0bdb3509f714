//! Route lookups over the static schedule.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::gtfs::{LatLng, Route, RouteShape, Stop};

use super::error::ServiceError;
use super::AggregationService;

/// Every shape drawn by a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteShapes {
    pub route_id: String,
    pub shapes: Vec<RouteShape>,
}

/// Drawable polyline of a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineGeometry {
    pub route_id: String,
    pub coordinates: Vec<LatLng>,
}

/// Ordered stops of a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStops {
    pub route_id: String,
    pub stops: Vec<Stop>,
}

impl AggregationService {
    /// All routes, in table order.
    pub async fn routes(&self) -> Vec<Route> {
        self.index().await.routes().to_vec()
    }

    /// Shapes of `route_id`, cached under `line_shape_{route_id}`.
    pub async fn line_shapes(&self, route_id: &str) -> Result<Arc<RouteShapes>, ServiceError> {
        let snapshot = self.snapshot().await;
        let ttl = self.ttl.resolve("lines", route_id);
        let shapes = self
            .caches
            .shapes
            .get_or_try_insert_with(snapshot.key(&format!("line_shape_{route_id}")), ttl, async {
                debug!(route_id, "Building route shapes");
                let shapes = snapshot.index.shapes_for_route(route_id)?;
                Ok::<_, ServiceError>(Arc::new(RouteShapes {
                    route_id: route_id.to_string(),
                    shapes,
                }))
            })
            .await?;
        Ok(shapes)
    }

    /// Polyline of `route_id`, cached under `line_{route_id}`.
    pub async fn line(&self, route_id: &str) -> Result<Arc<LineGeometry>, ServiceError> {
        let snapshot = self.snapshot().await;
        let ttl = self.ttl.resolve("lines", route_id);
        let line = self
            .caches
            .lines
            .get_or_try_insert_with(snapshot.key(&format!("line_{route_id}")), ttl, async {
                let coordinates = snapshot.index.line_geometry(route_id)?;
                Ok::<_, ServiceError>(Arc::new(LineGeometry {
                    route_id: route_id.to_string(),
                    coordinates,
                }))
            })
            .await?;
        Ok(line)
    }

    /// Ordered stops of `route_id`, cached under `route_stops_{route_id}`.
    pub async fn stops_for_route(&self, route_id: &str) -> Result<Arc<RouteStops>, ServiceError> {
        let snapshot = self.snapshot().await;
        let ttl = self.ttl.resolve("route_stops", route_id);
        let stops = self
            .caches
            .route_stops
            .get_or_try_insert_with(snapshot.key(&format!("route_stops_{route_id}")), ttl, async {
                let stops = snapshot.index.stops_for_route(route_id)?;
                Ok::<_, ServiceError>(Arc::new(RouteStops {
                    route_id: route_id.to_string(),
                    stops,
                }))
            })
            .await?;
        Ok(stops)
    }
}
