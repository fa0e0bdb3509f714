//! Feed and cache configuration.
//!
//! The configuration is supplied by whoever bootstraps the process; the core
//! only reads it. It is usually deserialized from a JSON document:
//!
//! ```json
//! {
//!   "subway": { "ace": "https://example.org/nyct%2Fgtfs-ace" },
//!   "lirr": { "lirr": "https://example.org/lirr%2Fgtfs-lirr" },
//!   "mnr": { "mnr": "https://example.org/mnr%2Fgtfs-mnr" },
//!   "alerts": { "all": "https://example.org/camsys%2Fall-alerts" },
//!   "accessibility": {
//!     "current": "https://example.org/nyct_ene.json",
//!     "upcoming": "https://example.org/nyct_ene_upcoming.json",
//!     "equipment": "https://example.org/nyct_ene_equipments.json"
//!   },
//!   "cache_timeouts": { "subway_default": 30, "accessibility_default": 300 }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::cache::TtlPolicy;

/// Default upstream request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum concurrent upstream requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Feed categories known to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedCategory {
    Subway,
    Lirr,
    Mnr,
    Alerts,
    Accessibility,
}

impl FeedCategory {
    /// All categories, in the order they are reported.
    pub const ALL: [FeedCategory; 5] = [
        FeedCategory::Subway,
        FeedCategory::Lirr,
        FeedCategory::Mnr,
        FeedCategory::Alerts,
        FeedCategory::Accessibility,
    ];

    /// Name used in cache keys and TTL lookups.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedCategory::Subway => "subway",
            FeedCategory::Lirr => "lirr",
            FeedCategory::Mnr => "mnr",
            FeedCategory::Alerts => "alerts",
            FeedCategory::Accessibility => "accessibility",
        }
    }

    /// Message for an id that isn't configured in this category.
    pub fn invalid_id_message(&self, id: &str) -> String {
        match self {
            FeedCategory::Subway => format!("Invalid subway feed: {id}"),
            FeedCategory::Lirr => format!("Invalid LIRR feed: {id}"),
            FeedCategory::Mnr => format!("Invalid MNR feed: {id}"),
            FeedCategory::Alerts => format!("Invalid alert type: {id}"),
            FeedCategory::Accessibility => format!("Invalid accessibility data type: {id}"),
        }
    }
}

impl fmt::Display for FeedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
}

impl ClientConfig {
    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Errors reading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Feed URLs per category plus cache lifetimes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub subway: BTreeMap<String, String>,
    pub lirr: BTreeMap<String, String>,
    pub mnr: BTreeMap<String, String>,
    pub alerts: BTreeMap<String, String>,
    /// `current`, `upcoming` and `equipment` accessibility feeds.
    pub accessibility: BTreeMap<String, String>,
    /// Seconds per item id or `{category}_default` key.
    pub cache_timeouts: HashMap<String, u64>,
    pub client: ClientConfig,
}

impl FeedConfig {
    /// Parse a configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Add a feed to a category.
    pub fn with_feed(
        mut self,
        category: FeedCategory,
        id: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.feeds_mut(category).insert(id.into(), url.into());
        self
    }

    /// Set a cache lifetime for an item id or `{category}_default` key.
    pub fn with_timeout(mut self, key: impl Into<String>, secs: u64) -> Self {
        self.cache_timeouts.insert(key.into(), secs);
        self
    }

    /// Feeds configured for a category.
    pub fn feeds(&self, category: FeedCategory) -> &BTreeMap<String, String> {
        match category {
            FeedCategory::Subway => &self.subway,
            FeedCategory::Lirr => &self.lirr,
            FeedCategory::Mnr => &self.mnr,
            FeedCategory::Alerts => &self.alerts,
            FeedCategory::Accessibility => &self.accessibility,
        }
    }

    fn feeds_mut(&mut self, category: FeedCategory) -> &mut BTreeMap<String, String> {
        match category {
            FeedCategory::Subway => &mut self.subway,
            FeedCategory::Lirr => &mut self.lirr,
            FeedCategory::Mnr => &mut self.mnr,
            FeedCategory::Alerts => &mut self.alerts,
            FeedCategory::Accessibility => &mut self.accessibility,
        }
    }

    /// URL for a feed id, if configured.
    pub fn url(&self, category: FeedCategory, id: &str) -> Option<&str> {
        self.feeds(category).get(id).map(String::as_str)
    }

    /// TTL policy built from the configured timeouts.
    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::new(self.cache_timeouts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse_full_document() {
        let json = r#"{
            "subway": { "ace": "http://feeds/ace", "bdfm": "http://feeds/bdfm" },
            "alerts": { "subway": "http://feeds/alerts" },
            "accessibility": { "equipment": "http://feeds/equipment" },
            "cache_timeouts": { "subway_default": 30 },
            "client": { "timeout_secs": 5 }
        }"#;
        let config = FeedConfig::from_json(json).unwrap();

        assert_eq!(config.url(FeedCategory::Subway, "ace"), Some("http://feeds/ace"));
        assert_eq!(config.feeds(FeedCategory::Subway).len(), 2);
        assert!(config.lirr.is_empty());
        assert_eq!(config.client.timeout_secs, 5);
        assert_eq!(config.client.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(
            config.ttl_policy().resolve("subway", "ace"),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn reject_malformed_document() {
        assert!(matches!(
            FeedConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FeedConfig::from_file("/nonexistent/feeds.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/feeds.json"));
    }

    #[test]
    fn builder_adds_feeds() {
        let config = FeedConfig::default()
            .with_feed(FeedCategory::Mnr, "mnr", "http://feeds/mnr")
            .with_timeout("mnr", 15);

        assert_eq!(config.url(FeedCategory::Mnr, "mnr"), Some("http://feeds/mnr"));
        assert_eq!(config.url(FeedCategory::Mnr, "other"), None);
        assert_eq!(config.cache_timeouts.get("mnr"), Some(&15));
    }

    #[test]
    fn invalid_id_messages() {
        assert_eq!(
            FeedCategory::Subway.invalid_id_message("xyz"),
            "Invalid subway feed: xyz"
        );
        assert_eq!(
            FeedCategory::Alerts.invalid_id_message("xyz"),
            "Invalid alert type: xyz"
        );
    }
}
