//! GTFS-Realtime feeds.
//!
//! Fetches protobuf feed bodies from upstream and decodes them into plain
//! serializable records: vehicle positions, trip updates and alerts.

mod client;
mod decode;
mod error;
mod types;

pub use client::{FeedFetcher, HttpFeedClient};
pub use decode::{decode, human_time};
pub use error::{DecodeError, FetchError};
pub use types::{
    ActivePeriod, AlertRecord, DecodedFeed, EntityKind, FeedHeader, InformedEntity, Position,
    RealtimeEntity, Stamp, StopTimeEventRecord, StopTimeUpdateRecord, TripRef, TripUpdateRecord,
    VehicleStatus, VehicleUpdate, alert_cause_name, alert_effect_name,
};

#[cfg(test)]
pub(crate) use decode::fixtures;
