//! Transit data aggregation server.
//!
//! Combines a static GTFS schedule with GTFS-Realtime feeds and elevator /
//! escalator accessibility feeds, and serves cached, joined answers:
//! "which routes stop here?", "where is this line?", "what arrives next?".

pub mod cache;
pub mod config;
pub mod gtfs;
pub mod realtime;
pub mod service;
