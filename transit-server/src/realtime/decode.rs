//! GTFS-RT protobuf decoding.

use chrono::{DateTime, Local};
use prost::Message;
use tracing::debug;

use super::error::DecodeError;
use super::types::{
    ActivePeriod, AlertRecord, DecodedFeed, EntityKind, FeedHeader, InformedEntity, Position,
    RealtimeEntity, Stamp, StopTimeEventRecord, StopTimeUpdateRecord, TripRef, TripUpdateRecord,
    VehicleStatus, VehicleUpdate, alert_cause_name, alert_effect_name,
};

const HUMAN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decode raw feed bytes fetched under `feed_id`.
///
/// Decoding is pure: the same bytes always give the same records.
pub fn decode(bytes: &[u8], feed_id: &str) -> Result<DecodedFeed, DecodeError> {
    let message = gtfs_rt::FeedMessage::decode(bytes)?;

    let header = FeedHeader {
        timestamp: message.header.timestamp,
        human_time: message.header.timestamp.and_then(human_time),
        feed_id: feed_id.to_string(),
    };

    let mut entities = Vec::with_capacity(message.entity.len());
    for entity in message.entity {
        let id = entity.id;
        if let Some(vehicle) = entity.vehicle {
            entities.push(RealtimeEntity {
                id: id.clone(),
                kind: EntityKind::Vehicle(vehicle_update(vehicle)),
            });
        }
        if let Some(trip_update) = entity.trip_update {
            entities.push(RealtimeEntity {
                id: id.clone(),
                kind: EntityKind::TripUpdate(trip_update_record(trip_update)),
            });
        }
        if let Some(alert) = entity.alert {
            entities.push(RealtimeEntity {
                id,
                kind: EntityKind::Alert(alert_record(alert)),
            });
        }
    }

    debug!(feed_id, entities = entities.len(), "Decoded realtime feed");

    Ok(DecodedFeed { header, entities })
}

/// Local wall-clock rendering of an epoch timestamp.
pub fn human_time<T>(secs: T) -> Option<String>
where
    T: TryInto<i64>,
{
    let secs = secs.try_into().ok()?;
    let utc = DateTime::from_timestamp(secs, 0)?;
    Some(
        utc.with_timezone(&Local)
            .format(HUMAN_TIME_FORMAT)
            .to_string(),
    )
}

fn trip_ref(trip: gtfs_rt::TripDescriptor) -> TripRef {
    TripRef {
        trip_id: trip.trip_id,
        route_id: trip.route_id,
    }
}

fn vehicle_update(vehicle: gtfs_rt::VehiclePosition) -> VehicleUpdate {
    VehicleUpdate {
        trip: vehicle.trip.map(trip_ref).unwrap_or_default(),
        timestamp: vehicle.timestamp,
        human_time: vehicle.timestamp.and_then(human_time),
        position: vehicle.position.map(|p| Position {
            latitude: p.latitude,
            longitude: p.longitude,
            bearing: p.bearing,
            speed: p.speed,
        }),
        current_status: vehicle.current_status.map(VehicleStatus::from_code),
        stop_id: vehicle.stop_id,
    }
}

fn stop_time_event(event: gtfs_rt::trip_update::StopTimeEvent) -> StopTimeEventRecord {
    StopTimeEventRecord {
        time: event.time,
        human_time: event.time.and_then(human_time),
        delay: event.delay,
    }
}

fn trip_update_record(update: gtfs_rt::TripUpdate) -> TripUpdateRecord {
    TripUpdateRecord {
        trip: trip_ref(update.trip),
        timestamp: update.timestamp,
        human_time: update.timestamp.and_then(human_time),
        stop_time_updates: update
            .stop_time_update
            .into_iter()
            .map(|stu| StopTimeUpdateRecord {
                stop_id: stu.stop_id,
                arrival: stu.arrival.map(stop_time_event),
                departure: stu.departure.map(stop_time_event),
            })
            .collect(),
    }
}

fn first_translation(text: Option<gtfs_rt::TranslatedString>) -> Option<String> {
    text.and_then(|t| t.translation.into_iter().next().map(|t| t.text))
}

fn stamp(secs: u64) -> Stamp {
    Stamp {
        timestamp: secs,
        human_time: human_time(secs),
    }
}

fn alert_record(alert: gtfs_rt::Alert) -> AlertRecord {
    AlertRecord {
        cause: alert.cause.map(alert_cause_name),
        effect: alert.effect.map(alert_effect_name),
        url: first_translation(alert.url),
        header_text: first_translation(alert.header_text),
        description_text: first_translation(alert.description_text),
        active_period: alert
            .active_period
            .into_iter()
            .map(|period| ActivePeriod {
                start: period.start.map(stamp),
                end: period.end.map(stamp),
            })
            .collect(),
        informed_entity: alert
            .informed_entity
            .into_iter()
            .map(|e| InformedEntity {
                agency_id: e.agency_id,
                route_id: e.route_id,
                route_type: e.route_type,
                stop_id: e.stop_id,
            })
            .collect(),
    }
}
