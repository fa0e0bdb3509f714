//! Realtime and accessibility feed lookups.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::FeedCategory;
use crate::realtime::{DecodedFeed, decode};

use super::accessibility::{AccessibilityData, Equipment, Outage, OutageDocument};
use super::error::ServiceError;
use super::AggregationService;

const EQUIPMENT: &str = "equipment";
const CURRENT: &str = "current";
const UPCOMING: &str = "upcoming";

impl AggregationService {
    /// Decoded realtime feed `feed_id` of `category`.
    ///
    /// Cached under `{category}_{feed_id}` for the lifetime resolved from the
    /// configured timeouts. Concurrent misses share one fetch.
    pub async fn get_feed(
        &self,
        category: FeedCategory,
        feed_id: &str,
    ) -> Result<Arc<DecodedFeed>, ServiceError> {
        let url = match category {
            FeedCategory::Accessibility => None,
            _ => self.config.url(category, feed_id),
        }
        .ok_or_else(|| ServiceError::InvalidInput(category.invalid_id_message(feed_id)))?;

        let key = format!("{category}_{feed_id}");
        let ttl = self.ttl.resolve(category.as_str(), feed_id);

        let feed = self
            .caches
            .feeds
            .get_or_try_insert_with(key, ttl, async {
                debug!(%category, feed_id, "Feed cache miss");
                let bytes = self.fetch(url).await?;
                let feed = decode(&bytes, feed_id)?;
                Ok::<_, ServiceError>(Arc::new(feed))
            })
            .await?;
        Ok(feed)
    }

    /// Configured feed ids per category.
    pub fn available_feeds(&self) -> BTreeMap<&'static str, Vec<String>> {
        FeedCategory::ALL
            .iter()
            .map(|category| {
                let ids = self.config.feeds(*category).keys().cloned().collect();
                (category.as_str(), ids)
            })
            .collect()
    }

    /// Configured feed URLs of one category, keyed by id.
    pub fn feed_urls(&self, category: FeedCategory) -> BTreeMap<String, String> {
        self.config.feeds(category).clone()
    }

    /// Raw accessibility data: `equipment`, `current` or `upcoming`.
    pub async fn get_accessibility_data(
        &self,
        data_type: &str,
    ) -> Result<AccessibilityData, ServiceError> {
        match data_type {
            EQUIPMENT => Ok(AccessibilityData::Equipment(
                self.equipment().await?.as_ref().clone(),
            )),
            CURRENT | UPCOMING => Ok(AccessibilityData::Outages(
                self.outages(data_type).await?.as_ref().clone(),
            )),
            _ => Err(self.invalid_accessibility_type(data_type)),
        }
    }

    fn invalid_accessibility_type(&self, data_type: &str) -> ServiceError {
        ServiceError::InvalidInput(FeedCategory::Accessibility.invalid_id_message(data_type))
    }

    fn accessibility_url(&self, data_type: &str) -> Result<&str, ServiceError> {
        self.config
            .url(FeedCategory::Accessibility, data_type)
            .ok_or_else(|| self.invalid_accessibility_type(data_type))
    }

    /// Elevator and escalator inventory.
    pub(super) async fn equipment(&self) -> Result<Arc<Vec<Equipment>>, ServiceError> {
        let url = self.accessibility_url(EQUIPMENT)?;
        let ttl = self.ttl.resolve(FeedCategory::Accessibility.as_str(), EQUIPMENT);

        let equipment = self
            .caches
            .equipment
            .get_or_try_insert_with(format!("accessibility_{EQUIPMENT}"), ttl, async {
                let bytes = self.fetch(url).await?;
                let equipment: Vec<Equipment> = serde_json::from_slice(&bytes).map_err(|e| {
                    ServiceError::DataSource(format!("invalid equipment data: {e}"))
                })?;
                debug!(count = equipment.len(), "Loaded accessibility equipment");
                Ok::<_, ServiceError>(Arc::new(equipment))
            })
            .await?;
        Ok(equipment)
    }

    /// Current or upcoming outages.
    pub(super) async fn outages(&self, data_type: &str) -> Result<Arc<Vec<Outage>>, ServiceError> {
        let url = self.accessibility_url(data_type)?;
        let ttl = self.ttl.resolve(FeedCategory::Accessibility.as_str(), data_type);

        let outages = self
            .caches
            .outages
            .get_or_try_insert_with(format!("accessibility_{data_type}"), ttl, async {
                let bytes = self.fetch(url).await?;
                let document: OutageDocument = serde_json::from_slice(&bytes).map_err(|e| {
                    ServiceError::DataSource(format!("invalid {data_type} outage data: {e}"))
                })?;
                Ok::<_, ServiceError>(Arc::new(document.into_outages()))
            })
            .await?;
        Ok(outages)
    }

    /// Outages, or none when the feed can't be read.
    pub(super) async fn outages_or_empty(&self, data_type: &str) -> Arc<Vec<Outage>> {
        match self.outages(data_type).await {
            Ok(outages) => outages,
            Err(e) => {
                warn!(data_type, error = %e, "Outage data unavailable");
                Arc::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::join_all;

    use crate::service::testing::*;
    use super::*;
    use crate::realtime::{EntityKind, FetchError, fixtures::vehicle_feed};

    #[tokio::test]
    async fn unknown_feed_is_invalid_input() {
        let fetcher = Arc::new(MockFetcher::new());
        let service = service(Arc::clone(&fetcher));

        let err = service.get_feed(FeedCategory::Subway, "xyz").await.unwrap_err();
        assert_eq!(err, ServiceError::InvalidInput("Invalid subway feed: xyz".into()));

        let err = service.get_feed(FeedCategory::Lirr, "ace").await.unwrap_err();
        assert_eq!(err, ServiceError::InvalidInput("Invalid LIRR feed: ace".into()));

        let err = service.get_feed(FeedCategory::Alerts, "all").await.unwrap_err();
        assert_eq!(err, ServiceError::InvalidInput("Invalid alert type: all".into()));

        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn feed_is_fetched_decoded_and_cached() {
        let fetcher = Arc::new(MockFetcher::new().serve(ACE_URL, vehicle_feed("A", "A27N")));
        let service = service(Arc::clone(&fetcher));

        let feed = service.get_feed(FeedCategory::Subway, "ace").await.unwrap();
        assert_eq!(feed.header.feed_id, "ace");
        assert!(matches!(feed.entities[0].kind, EntityKind::Vehicle(_)));

        let again = service.get_feed(FeedCategory::Subway, "ace").await.unwrap();
        assert!(Arc::ptr_eq(&feed, &again));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_fetch_once() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_delay(Duration::from_millis(50))
                .serve(ACE_URL, vehicle_feed("A", "A27N")),
        );
        let service = service(Arc::clone(&fetcher));

        let results = join_all((0..10).map(|_| service.get_feed(FeedCategory::Subway, "ace"))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn upstream_status_is_reported_and_not_cached() {
        let fetcher = Arc::new(MockFetcher::new().fail(ACE_URL, FetchError::Status(503)));
        let service = service(Arc::clone(&fetcher));

        let err = service.get_feed(FeedCategory::Subway, "ace").await.unwrap_err();
        assert_eq!(err, ServiceError::Upstream("HTTP error: 503".into()));
        assert_eq!(err.payload().error, "HTTP error: 503");

        fetcher.set(ACE_URL, Ok(vehicle_feed("A", "A27N")));
        assert!(service.get_feed(FeedCategory::Subway, "ace").await.is_ok());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn malformed_feed_is_decode_error() {
        let fetcher = Arc::new(MockFetcher::new().serve(ACE_URL, b"\xff\xff\xff".to_vec()));
        let service = service(fetcher);

        let err = service.get_feed(FeedCategory::Subway, "ace").await.unwrap_err();
        assert!(matches!(err, ServiceError::Decode(_)));
    }

    #[tokio::test]
    async fn lists_configured_feeds() {
        let service = service(Arc::new(MockFetcher::new()));

        let feeds = service.available_feeds();
        assert_eq!(feeds["subway"], vec!["ace".to_string()]);
        assert!(feeds["lirr"].is_empty());
        assert_eq!(feeds["accessibility"], vec!["current", "equipment", "upcoming"]);

        let urls = service.feed_urls(FeedCategory::Subway);
        assert_eq!(urls.get("ace").map(String::as_str), Some(ACE_URL));
    }

    #[tokio::test]
    async fn accessibility_data_by_type() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .serve(
                    EQUIPMENT_URL,
                    r#"[{"equipmentno":"EL100","equipmenttype":"EL","isactive":"Y"}]"#,
                )
                .serve(
                    CURRENT_URL,
                    r#"{"outages":[{"equipment":"EL100","reason":"Repair"}]}"#,
                ),
        );
        let service = service(fetcher);

        let AccessibilityData::Equipment(equipment) =
            service.get_accessibility_data("equipment").await.unwrap()
        else {
            panic!("expected equipment");
        };
        assert_eq!(equipment[0].equipment_no, "EL100");
        assert!(!equipment[0].is_active);

        let AccessibilityData::Outages(outages) =
            service.get_accessibility_data("current").await.unwrap()
        else {
            panic!("expected outages");
        };
        assert_eq!(outages[0].reason, "Repair");

        let err = service.get_accessibility_data("stairs").await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::InvalidInput("Invalid accessibility data type: stairs".into())
        );
    }

    #[tokio::test]
    async fn accessibility_json_errors_are_data_source_errors() {
        let fetcher = Arc::new(MockFetcher::new().serve(EQUIPMENT_URL, "<html>"));
        let service = service(fetcher);

        let err = service.get_accessibility_data("equipment").await.unwrap_err();
        assert!(matches!(err, ServiceError::DataSource(_)));
    }

    #[tokio::test]
    async fn missing_outages_degrade_to_empty() {
        let service = service(Arc::new(MockFetcher::new()));
        assert!(service.outages_or_empty("upcoming").await.is_empty());
    }
}
