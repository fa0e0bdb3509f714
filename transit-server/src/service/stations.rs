//! Station lookups: routes, schedules and composed details.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::gtfs::{
    MAX_PER_ROUTE, MAX_ROUTE_ENTRIES, MAX_STATION_ENTRIES, Route, RouteSchedule, StaticIndex,
    StationRouteMap, StationSchedule, Stop,
};

use super::accessibility::{Equipment, Outage, StationEquipment};
use super::error::ServiceError;
use super::{AggregationService, IndexSnapshot, STATION_DETAILS_TTL, STATION_ROUTE_MAP_TTL};

/// Routes serving a station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRoutes {
    pub station_id: String,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilitySummary {
    pub has_accessibility: bool,
    pub equipment: Vec<StationEquipment>,
}

impl AccessibilitySummary {
    fn none() -> Self {
        Self {
            has_accessibility: false,
            equipment: Vec::new(),
        }
    }
}

/// Everything known about one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationDetails {
    #[serde(flatten)]
    pub stop: Stop,
    pub routes: Vec<Route>,
    pub accessibility: AccessibilitySummary,
    pub schedule: StationSchedule,
}

impl AggregationService {
    /// Stations from the static schedule.
    pub async fn stations(&self) -> Vec<Stop> {
        self.index().await.stations()
    }

    /// Routes serving each stop, cached for a day under `station_route_map`.
    pub async fn station_route_map(&self) -> Result<Arc<StationRouteMap>, ServiceError> {
        let snapshot = self.snapshot().await;
        self.station_route_map_of(&snapshot).await
    }

    pub(super) async fn station_route_map_of(
        &self,
        snapshot: &IndexSnapshot,
    ) -> Result<Arc<StationRouteMap>, ServiceError> {
        let map = self
            .caches
            .station_route_map
            .get_or_try_insert_with(snapshot.key("station_route_map"), STATION_ROUTE_MAP_TTL, async {
                debug!(generation = snapshot.generation, "Building station route map");
                Ok::<_, ServiceError>(Arc::new(snapshot.index.station_route_map()))
            })
            .await?;
        Ok(map)
    }

    /// Routes serving `station_id`, in table order.
    pub async fn routes_for_station(&self, station_id: &str) -> Result<StationRoutes, ServiceError> {
        let snapshot = self.snapshot().await;
        Ok(StationRoutes {
            station_id: station_id.to_string(),
            routes: self.routes_at(&snapshot, station_id).await?,
        })
    }

    async fn routes_at(
        &self,
        snapshot: &IndexSnapshot,
        station_id: &str,
    ) -> Result<Vec<Route>, ServiceError> {
        let map = self.station_route_map_of(snapshot).await?;
        let route_ids = map
            .get(station_id)
            .ok_or_else(|| ServiceError::NotFound("Station not found".to_string()))?;

        Ok(snapshot
            .index
            .routes()
            .iter()
            .filter(|route| route_ids.contains(&route.id))
            .cloned()
            .collect())
    }

    /// Upcoming calls at `station_id` across its routes.
    pub async fn station_schedule(&self, station_id: &str) -> StationSchedule {
        let index = self.index().await;
        self.schedule_at(&index, station_id)
    }

    fn schedule_at(&self, index: &StaticIndex, station_id: &str) -> StationSchedule {
        index.station_schedule(
            station_id,
            &self.current_time(),
            MAX_PER_ROUTE,
            MAX_STATION_ENTRIES,
        )
    }

    /// Upcoming calls of `route_id` at `station_id`.
    pub async fn station_route_schedule(
        &self,
        station_id: &str,
        route_id: &str,
    ) -> Result<RouteSchedule, ServiceError> {
        Ok(self.index().await.route_schedule_at_station(
            station_id,
            route_id,
            &self.current_time(),
            MAX_ROUTE_ENTRIES,
        )?)
    }

    /// Stop fields, routes, accessibility and schedule of a station.
    ///
    /// Cached for five minutes under `station_details_{station_id}`.
    /// Accessibility failures leave the station without equipment rather
    /// than failing the lookup.
    pub async fn get_station_details(
        &self,
        station_id: &str,
    ) -> Result<Arc<StationDetails>, ServiceError> {
        let snapshot = self.snapshot().await;
        self.caches
            .station_details
            .get_or_try_insert_with(
                snapshot.key(&format!("station_details_{station_id}")),
                STATION_DETAILS_TTL,
                self.build_station_details(&snapshot, station_id),
            )
            .await
            .map_err(|e| ServiceError::from(e).in_context("Failed to get station details"))
    }

    async fn build_station_details(
        &self,
        snapshot: &IndexSnapshot,
        station_id: &str,
    ) -> Result<Arc<StationDetails>, ServiceError> {
        let stop = snapshot
            .index
            .stop(station_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound("Station not found".to_string()))?;

        let routes = match self.routes_at(snapshot, station_id).await {
            Ok(routes) => routes,
            Err(e) => {
                debug!(station_id, error = %e, "No routes for station");
                Vec::new()
            }
        };

        let accessibility = match self.equipment().await {
            Ok(equipment) => {
                let current = self.outages_or_empty("current").await;
                let matched = matching_equipment(&equipment, &stop, &current);
                AccessibilitySummary {
                    has_accessibility: !matched.is_empty(),
                    equipment: matched,
                }
            }
            Err(e) => {
                warn!(station_id, error = %e, "Accessibility data unavailable");
                AccessibilitySummary::none()
            }
        };

        let schedule = self.schedule_at(&snapshot.index, station_id);

        Ok(Arc::new(StationDetails {
            stop,
            routes,
            accessibility,
            schedule,
        }))
    }
}

/// Equipment at a stop, by exact GTFS id or by station name.
///
/// Names match when either one contains the other, ignoring case and
/// surrounding whitespace. Each equipment row is taken at most once.
fn matching_equipment(
    equipment: &[Equipment],
    stop: &Stop,
    current: &[Outage],
) -> Vec<StationEquipment> {
    let stop_name = stop.name.trim().to_lowercase();
    equipment
        .iter()
        .filter(|item| {
            if item.gtfs_stop_id == stop.id {
                return true;
            }
            let item_name = item.station_name.trim().to_lowercase();
            !item_name.is_empty()
                && (stop_name.contains(&item_name) || item_name.contains(&stop_name))
        })
        .map(|item| StationEquipment::join(item, current, &[]))
        .collect()
}
