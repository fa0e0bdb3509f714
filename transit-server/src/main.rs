use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use transit_server::config::{FeedCategory, FeedConfig};
use transit_server::gtfs::StaticIndex;
use transit_server::realtime::HttpFeedClient;
use transit_server::service::{AggregationService, ServiceCaches};

/// Default directory holding the static GTFS tables.
const DEFAULT_GTFS_DIR: &str = "data/gtfs_subway";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("TRANSIT_FEEDS_CONFIG") {
        Ok(path) => FeedConfig::from_file(&path).expect("Failed to read feed configuration"),
        Err(_) => {
            warn!("TRANSIT_FEEDS_CONFIG not set. No realtime feeds are configured.");
            FeedConfig::default()
        }
    };

    let gtfs_dir =
        std::env::var("TRANSIT_GTFS_DIR").unwrap_or_else(|_| DEFAULT_GTFS_DIR.to_string());

    // Fail fast if the static schedule is unavailable
    let index = tokio::task::spawn_blocking(move || StaticIndex::load(gtfs_dir))
        .await
        .expect("Static load task panicked")
        .expect("Failed to load static schedule");

    let client = HttpFeedClient::new(&config.client).expect("Failed to create feed client");
    let service = AggregationService::new(config, index, Arc::new(client), ServiceCaches::new());

    info!(
        stations = service.stations().await.len(),
        routes = service.routes().await.len(),
        "Static schedule ready"
    );

    for (category, ids) in service.available_feeds() {
        info!(category, feeds = ?ids, "Configured feeds");
    }

    // Smoke query against the first subway feed
    let first = service
        .config()
        .feeds(FeedCategory::Subway)
        .keys()
        .next()
        .cloned();
    if let Some(feed_id) = first {
        match service.get_feed(FeedCategory::Subway, &feed_id).await {
            Ok(feed) => info!(
                feed_id = %feed_id,
                entities = feed.entities.len(),
                timestamp = ?feed.header.human_time,
                "Fetched realtime feed"
            ),
            Err(e) => error!(feed_id = %feed_id, error = %e, "Realtime feed unavailable"),
        }
    }
}
