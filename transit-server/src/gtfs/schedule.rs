//! Upcoming scheduled calls at a station.
//!
//! "Upcoming" is decided by comparing the GTFS `arrival_time` string with the
//! current `HH:MM:SS` wall-clock string. Trips past midnight are written as
//! `24:xx:xx` and later, so they always sort after any same-day time, and
//! yesterday's late trips are never recognised as running now.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::error::GtfsError;
use super::index::StaticIndex;
use super::types::{ScheduleEntry, StopTime, Trip};

/// Default cap on upcoming calls per route at a station.
pub const MAX_PER_ROUTE: usize = 5;

/// Default cap on upcoming calls at a station across all routes.
pub const MAX_STATION_ENTRIES: usize = 40;

/// Default cap on upcoming calls for one route at a station.
pub const MAX_ROUTE_ENTRIES: usize = 10;

/// Upcoming calls at a station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSchedule {
    pub schedule_entries: usize,
    pub schedule: Vec<ScheduleEntry>,
}

impl StationSchedule {
    fn new(schedule: Vec<ScheduleEntry>) -> Self {
        Self {
            schedule_entries: schedule.len(),
            schedule,
        }
    }
}

/// Upcoming calls of one route at a station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSchedule {
    pub station_id: String,
    pub route_id: String,
    pub schedule_entries: usize,
    pub schedule: Vec<ScheduleEntry>,
}

impl StaticIndex {
    /// Upcoming calls at `station_id` for every route serving it.
    ///
    /// Sorted by arrival time, at most `max_per_route` per route and
    /// `max_total` overall.
    pub fn station_schedule(
        &self,
        station_id: &str,
        current_time: &str,
        max_per_route: usize,
        max_total: usize,
    ) -> StationSchedule {
        let serving: BTreeSet<&str> = self
            .stop_times_at(station_id)
            .filter_map(|st| self.trip(&st.trip_id))
            .map(|trip| trip.route_id.as_str())
            .collect();

        let upcoming = self.upcoming_at(station_id, current_time, |route_id| {
            serving.contains(route_id)
        });

        let mut per_route: HashMap<String, usize> = HashMap::new();
        let mut schedule = Vec::new();
        for entry in upcoming {
            if schedule.len() >= max_total {
                break;
            }
            let count = per_route.entry(entry.route_id.clone()).or_default();
            if *count < max_per_route {
                *count += 1;
                schedule.push(entry);
            }
        }

        StationSchedule::new(schedule)
    }

    /// Upcoming calls of `route_id` at `station_id`, at most `max_total`.
    pub fn route_schedule_at_station(
        &self,
        station_id: &str,
        route_id: &str,
        current_time: &str,
        max_total: usize,
    ) -> Result<RouteSchedule, GtfsError> {
        if self.trips_for_route(route_id).next().is_none() {
            return Err(GtfsError::NotFound(format!(
                "No trips found for route {route_id}"
            )));
        }

        let schedule: Vec<ScheduleEntry> = self
            .upcoming_at(station_id, current_time, |r| r == route_id)
            .into_iter()
            .take(max_total)
            .collect();

        Ok(RouteSchedule {
            station_id: station_id.to_string(),
            route_id: route_id.to_string(),
            schedule_entries: schedule.len(),
            schedule,
        })
    }

    /// Calls at a stop after `current_time` on routes accepted by
    /// `route_filter`, sorted by arrival time. Ties keep table order.
    fn upcoming_at<F>(&self, stop_id: &str, current_time: &str, route_filter: F) -> Vec<ScheduleEntry>
    where
        F: Fn(&str) -> bool,
    {
        let mut entries: Vec<ScheduleEntry> = self
            .stop_times_at(stop_id)
            .filter(|st| st.arrival_time.as_str() > current_time)
            .filter_map(|st| {
                let trip = self.trip(&st.trip_id)?;
                route_filter(trip.route_id.as_str()).then(|| entry_for(st, trip))
            })
            .collect();

        entries.sort_by(|a, b| a.arrival_time.cmp(&b.arrival_time));
        entries
    }
}

fn entry_for(st: &StopTime, trip: &Trip) -> ScheduleEntry {
    ScheduleEntry {
        trip_id: trip.id.clone(),
        route_id: trip.route_id.clone(),
        trip_headsign: trip.headsign.clone(),
        arrival_time: st.arrival_time.clone(),
        departure_time: st.departure_time.clone(),
        direction_id: trip.direction_id.clone(),
    }
}
