//! Aggregation service.
//!
//! Answers every query the outer layer needs by combining the static schedule
//! index, realtime feeds and the accessibility feeds. Upstream data is fetched
//! on a cache miss and held for its configured lifetime; values derived from
//! the static index are keyed by the index generation and dropped on reload.

mod accessibility;
mod error;
mod feeds;
mod routes;
mod stations;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveTime};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{TtlCache, TtlPolicy};
use crate::config::FeedConfig;
use crate::gtfs::{StaticIndex, StationRouteMap};
use crate::realtime::{DecodedFeed, FeedFetcher};

pub use accessibility::{
    AccessibilityData, AccessibleStation, Equipment, Outage, StationAccessibility,
    StationEquipment, WheelchairInfo,
};
pub use error::{ErrorPayload, ServiceError};
pub use routes::{LineGeometry, RouteShapes, RouteStops};
pub use stations::{AccessibilitySummary, StationDetails, StationRoutes};

/// Lifetime of the derived station → routes map.
pub const STATION_ROUTE_MAP_TTL: Duration = Duration::from_secs(86_400);

/// Lifetime of composed station details.
pub const STATION_DETAILS_TTL: Duration = Duration::from_secs(300);

/// Wall-clock source used for "upcoming" schedule filtering.
pub type Clock = Arc<dyn Fn() -> NaiveTime + Send + Sync>;

/// Caches used by the service, one per value type.
///
/// Constructed by the caller and handed to [`AggregationService::new`].
#[derive(Default)]
pub struct ServiceCaches {
    feeds: TtlCache<Arc<DecodedFeed>>,
    equipment: TtlCache<Arc<Vec<Equipment>>>,
    outages: TtlCache<Arc<Vec<Outage>>>,
    station_route_map: TtlCache<Arc<StationRouteMap>>,
    shapes: TtlCache<Arc<RouteShapes>>,
    lines: TtlCache<Arc<LineGeometry>>,
    route_stops: TtlCache<Arc<RouteStops>>,
    station_details: TtlCache<Arc<StationDetails>>,
}

impl ServiceCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop entries derived from the static schedule.
    fn invalidate_static(&self) {
        self.station_route_map.invalidate_all();
        self.shapes.invalidate_all();
        self.lines.invalidate_all();
        self.route_stops.invalidate_all();
        self.station_details.invalidate_all();
    }

    /// Total entries across all caches (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.feeds.entry_count()
            + self.equipment.entry_count()
            + self.outages.entry_count()
            + self.station_route_map.entry_count()
            + self.shapes.entry_count()
            + self.lines.entry_count()
            + self.route_stops.entry_count()
            + self.station_details.entry_count()
    }
}

/// Static index tagged with the reload that produced it.
#[derive(Clone)]
struct IndexSnapshot {
    index: Arc<StaticIndex>,
    generation: u64,
}

impl IndexSnapshot {
    /// Cache key of a value derived from this index.
    fn key(&self, base: &str) -> String {
        format!("{base}#{}", self.generation)
    }
}

/// Transit data aggregation service.
pub struct AggregationService {
    config: FeedConfig,
    ttl: TtlPolicy,
    index: RwLock<IndexSnapshot>,
    fetcher: Arc<dyn FeedFetcher>,
    caches: ServiceCaches,
    clock: Clock,
}

impl AggregationService {
    /// Create a service over a loaded index.
    pub fn new(
        config: FeedConfig,
        index: StaticIndex,
        fetcher: Arc<dyn FeedFetcher>,
        caches: ServiceCaches,
    ) -> Self {
        Self {
            ttl: config.ttl_policy(),
            config,
            index: RwLock::new(IndexSnapshot {
                index: Arc::new(index),
                generation: 0,
            }),
            fetcher,
            caches,
            clock: Arc::new(|| Local::now().time()),
        }
    }

    /// Replace the wall-clock source.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn caches(&self) -> &ServiceCaches {
        &self.caches
    }

    /// The current static index.
    pub async fn index(&self) -> Arc<StaticIndex> {
        self.snapshot().await.index
    }

    /// The current static index and its generation. Loaders of derived
    /// values read only from one snapshot.
    async fn snapshot(&self) -> IndexSnapshot {
        self.index.read().await.clone()
    }

    /// Load the static tables from `dir` and swap them in.
    ///
    /// The tables are parsed on a blocking thread. Readers keep the old index
    /// until the swap; a failed load leaves it in place. The swap bumps the
    /// generation, so derived values still being built from the old index
    /// land under keys nothing reads again.
    pub async fn reload_static(&self, dir: impl AsRef<Path>) -> Result<(), ServiceError> {
        let dir: PathBuf = dir.as_ref().to_path_buf();
        let index = tokio::task::spawn_blocking(move || StaticIndex::load(dir))
            .await
            .map_err(|e| ServiceError::DataSource(format!("static load task failed: {e}")))??;

        let generation = {
            let mut current = self.index.write().await;
            let generation = current.generation + 1;
            *current = IndexSnapshot {
                index: Arc::new(index),
                generation,
            };
            generation
        };
        self.caches.invalidate_static();
        info!(generation, "Static schedule reloaded");
        Ok(())
    }

    /// Current wall-clock time as a GTFS `HH:MM:SS` string.
    fn current_time(&self) -> String {
        (self.clock)().format("%H:%M:%S").to_string()
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        debug!(url, "Fetching upstream");
        Ok(self.fetcher.fetch(url).await?)
    }
}
