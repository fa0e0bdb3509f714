//! Decoded realtime feed records.
//!
//! Every wire field that may be absent is an `Option` and is left out of the
//! serialized record when absent. Zero is a real value for several of these
//! fields (a bearing of 0° is due north), so absence is never collapsed to a
//! default.

use serde::Serialize;

/// A decoded feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedFeed {
    pub header: FeedHeader,
    pub entities: Vec<RealtimeEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_time: Option<String>,
    /// The configured id the feed was fetched under.
    pub feed_id: String,
}

/// One payload of a feed entity.
///
/// A wire entity carrying more than one payload produces one record per
/// payload, all sharing the entity id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeEntity {
    pub id: String,
    #[serde(flatten)]
    pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    Vehicle(VehicleUpdate),
    TripUpdate(TripUpdateRecord),
    Alert(AlertRecord),
}

/// Trip reference shared by vehicle positions and trip updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TripRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
}

/// Where a vehicle is relative to its current stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    IncomingAt,
    StoppedAt,
    InTransitTo,
    Unknown,
}

impl VehicleStatus {
    /// Map a wire code. Unrecognised codes become `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => VehicleStatus::IncomingAt,
            1 => VehicleStatus::StoppedAt,
            2 => VehicleStatus::InTransitTo,
            _ => VehicleStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub latitude: f32,
    pub longitude: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleUpdate {
    pub trip: TripRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<VehicleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopTimeEventRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopTimeUpdateRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival: Option<StopTimeEventRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure: Option<StopTimeEventRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripUpdateRecord {
    pub trip: TripRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_time: Option<String>,
    pub stop_time_updates: Vec<StopTimeUpdateRecord>,
}

/// An epoch timestamp with its readable form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stamp {
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivePeriod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Stamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Stamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InformedEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_type: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_text: Option<String>,
    pub active_period: Vec<ActivePeriod>,
    pub informed_entity: Vec<InformedEntity>,
}

/// Name for an alert cause code.
pub fn alert_cause_name(code: i32) -> &'static str {
    match code {
        1 => "UNKNOWN_CAUSE",
        2 => "OTHER_CAUSE",
        3 => "TECHNICAL_PROBLEM",
        4 => "STRIKE",
        5 => "DEMONSTRATION",
        6 => "ACCIDENT",
        7 => "HOLIDAY",
        8 => "WEATHER",
        9 => "MAINTENANCE",
        10 => "CONSTRUCTION",
        11 => "POLICE_ACTIVITY",
        12 => "MEDICAL_EMERGENCY",
        _ => "UNKNOWN",
    }
}

/// Name for an alert effect code.
pub fn alert_effect_name(code: i32) -> &'static str {
    match code {
        1 => "NO_SERVICE",
        2 => "REDUCED_SERVICE",
        3 => "SIGNIFICANT_DELAYS",
        4 => "DETOUR",
        5 => "ADDITIONAL_SERVICE",
        6 => "MODIFIED_SERVICE",
        7 => "OTHER_EFFECT",
        8 => "UNKNOWN_EFFECT",
        9 => "STOP_MOVED",
        10 => "NO_EFFECT",
        11 => "ACCESSIBILITY_ISSUE",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_status_codes() {
        assert_eq!(VehicleStatus::from_code(0), VehicleStatus::IncomingAt);
        assert_eq!(VehicleStatus::from_code(1), VehicleStatus::StoppedAt);
        assert_eq!(VehicleStatus::from_code(2), VehicleStatus::InTransitTo);
        assert_eq!(VehicleStatus::from_code(99), VehicleStatus::Unknown);
        assert_eq!(VehicleStatus::from_code(-1), VehicleStatus::Unknown);
    }

    #[test]
    fn vehicle_status_serializes_as_symbol() {
        let json = serde_json::to_value(VehicleStatus::InTransitTo).unwrap();
        assert_eq!(json, "IN_TRANSIT_TO");
        let json = serde_json::to_value(VehicleStatus::Unknown).unwrap();
        assert_eq!(json, "UNKNOWN");
    }

    #[test]
    fn alert_codes_fall_back_to_unknown() {
        assert_eq!(alert_cause_name(9), "MAINTENANCE");
        assert_eq!(alert_cause_name(0), "UNKNOWN");
        assert_eq!(alert_effect_name(3), "SIGNIFICANT_DELAYS");
        assert_eq!(alert_effect_name(42), "UNKNOWN");
    }

    #[test]
    fn entity_serializes_with_type_tag() {
        let entity = RealtimeEntity {
            id: "e1".into(),
            kind: EntityKind::Vehicle(VehicleUpdate {
                trip: TripRef::default(),
                timestamp: None,
                human_time: None,
                position: None,
                current_status: Some(VehicleStatus::StoppedAt),
                stop_id: None,
            }),
        };

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["id"], "e1");
        assert_eq!(json["type"], "vehicle");
        assert_eq!(json["current_status"], "STOPPED_AT");
        assert!(json.get("position").is_none());
    }
}
