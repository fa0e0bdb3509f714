//! Caching layer for realtime feeds and derived schedule joins.
//!
//! Every entry carries its own time-to-live, resolved per key from the
//! configured timeouts. Expiry is checked when an entry is read; nothing
//! sweeps the cache in the background and there is no capacity bound, since
//! the key space is limited to configured feeds, routes and stations.
//!
//! Concurrent misses on the same key share one in-flight load: the first
//! caller runs the loader and everyone else waits for its result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache as MokaCache;

/// Lifetime used when neither an item override nor a category default exists.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// A cached value together with the lifetime it was stored with.
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

/// Expiry policy that reads the lifetime off each entry.
///
/// Overwriting a key restarts its clock with the new entry's lifetime.
struct PerEntryTtl;

impl<V> Expiry<String, Entry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// String-keyed cache with per-key expiry.
pub struct TtlCache<V> {
    entries: MokaCache<String, Entry<V>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        let entries = MokaCache::builder().expire_after(PerEntryTtl).build();
        Self { entries }
    }

    /// Get a live entry. Expired and missing keys both return `None`.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(key.into(), Entry { value, ttl }).await;
    }

    /// Get a live entry, or run `load` to produce one.
    ///
    /// Only one `load` runs per key at a time; concurrent callers for the
    /// same key wait and receive the same outcome. Errors are handed to every
    /// waiter and nothing is stored, so the next call loads again.
    pub async fn get_or_try_insert_with<F, E>(
        &self,
        key: impl Into<String>,
        ttl: Duration,
        load: F,
    ) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let entry = self
            .entries
            .try_get_with(key.into(), async move {
                load.await.map(|value| Entry { value, ttl })
            })
            .await?;
        Ok(entry.value)
    }

    /// Number of entries currently held (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Per-key lifetime lookup.
///
/// Keys are either an item id (e.g. `"ace"`) or a category default
/// (e.g. `"subway_default"`). Values are seconds.
#[derive(Debug, Clone, Default)]
pub struct TtlPolicy {
    timeouts: HashMap<String, u64>,
}

impl TtlPolicy {
    /// Create a policy from configured timeouts.
    pub fn new(timeouts: HashMap<String, u64>) -> Self {
        Self { timeouts }
    }

    /// Resolve the lifetime for an item in a category.
    ///
    /// An item override wins over `"{category}_default"`, which wins over
    /// [`DEFAULT_TTL_SECS`].
    pub fn resolve(&self, category: &str, item_id: &str) -> Duration {
        let secs = self
            .timeouts
            .get(item_id)
            .or_else(|| self.timeouts.get(&format!("{category}_default")))
            .copied()
            .unwrap_or(DEFAULT_TTL_SECS);
        Duration::from_secs(secs)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// An item override always wins, whatever the category default is.
        #[test]
        fn item_override_always_wins(
            item in "[a-z]{1,8}",
            item_secs in 1u64..100_000,
            category_secs in 1u64..100_000,
        ) {
            let mut timeouts = HashMap::new();
            timeouts.insert("subway_default".to_string(), category_secs);
            timeouts.insert(item.clone(), item_secs);
            let policy = TtlPolicy::new(timeouts);

            prop_assert_eq!(policy.resolve("subway", &item), Duration::from_secs(item_secs));
        }

        /// Without any matching key the global default applies.
        #[test]
        fn unknown_keys_get_global_default(category in "[a-z]{1,8}", item in "[a-z]{1,8}") {
            let policy = TtlPolicy::default();
            prop_assert_eq!(policy.resolve(&category, &item), Duration::from_secs(DEFAULT_TTL_SECS));
        }
    }
}
