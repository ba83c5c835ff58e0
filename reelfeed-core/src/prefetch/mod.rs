//! Speculative preview prefetch
//!
//! Warms preview images for upcoming feed items and remembers which keys
//! resolved. A key lives in at most one of the resolved cache or the
//! in-flight map. Every in-flight load carries a oneshot canceller and a
//! ticket; a completion only lands in the cache when its ticket still owns
//! the in-flight slot.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use reelfeed_contracts::image::ImageLoader;
use reelfeed_model::{FeedItem, ItemId};
use tokio::sync::oneshot;
use url::Url;

use crate::error::ConfigError;
use crate::infra::config::FeedConfig;
use crate::infra::constants::prefetch::CACHE_BUST_PARAM;
use crate::infra::spawner::Spawner;

struct Inflight {
    ticket: u64,
    canceller: oneshot::Sender<()>,
}

#[derive(Default)]
struct PrefetchState {
    resolved: HashMap<ItemId, String>,
    /// Resolution order, oldest first; drives capacity eviction.
    order: VecDeque<ItemId>,
    inflight: HashMap<ItemId, Inflight>,
    next_ticket: u64,
    cache_bust: Option<String>,
}

impl PrefetchState {
    fn insert_resolved(&mut self, key: ItemId, url: String, capacity: usize) {
        if self.resolved.contains_key(&key) {
            return;
        }
        while self.order.len() >= capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.resolved.remove(&oldest);
            log::trace!("Prefetch cache full; dropped {oldest}");
        }
        self.order.push_back(key.clone());
        self.resolved.insert(key, url);
    }

    /// Signal every in-flight load and forget it. Returns how many were
    /// cancelled.
    fn cancel_all(&mut self) -> usize {
        let cancelled = self.inflight.len();
        for (_, inflight) in self.inflight.drain() {
            let _ = inflight.canceller.send(());
        }
        cancelled
    }
}

struct PrefetchInner {
    loader: Arc<dyn ImageLoader>,
    base_url: Option<Url>,
    capacity: usize,
    spawner: Spawner,
    state: Mutex<PrefetchState>,
}

/// Bounded preview-URL cache with cancellable background loads.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PrefetchCache {
    inner: Arc<PrefetchInner>,
}

impl fmt::Debug for PrefetchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PrefetchCache")
            .field("capacity", &self.inner.capacity)
            .field("resolved", &state.resolved.len())
            .field("inflight", &state.inflight.len())
            .field("cache_bust", &state.cache_bust)
            .finish()
    }
}

impl PrefetchCache {
    pub fn new(
        loader: Arc<dyn ImageLoader>,
        capacity: usize,
        base_url: Option<Url>,
    ) -> Self {
        Self {
            inner: Arc::new(PrefetchInner {
                loader,
                base_url,
                capacity: capacity.max(1),
                spawner: Spawner::capture(),
                state: Mutex::new(PrefetchState::default()),
            }),
        }
    }

    pub fn from_config(
        loader: Arc<dyn ImageLoader>,
        config: &FeedConfig,
    ) -> Result<Self, ConfigError> {
        if config.prefetch_capacity == 0 {
            return Err(ConfigError::invalid(
                "prefetch_capacity",
                "must be at least 1",
            ));
        }
        let base_url = config
            .poster_base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|err| {
                ConfigError::invalid("poster_base_url", err.to_string())
            })?;
        Ok(Self::new(loader, config.prefetch_capacity, base_url))
    }

    /// Absolute preview URL for `item`, or `None` when it has no usable
    /// poster key. Relative keys need a base URL.
    pub fn url_for(&self, item: &FeedItem) -> Option<String> {
        let token = self.inner.state.lock().cache_bust.clone();
        self.derive_url(item, token.as_deref())
    }

    fn derive_url(&self, item: &FeedItem, token: Option<&str>) -> Option<String> {
        let key = item.poster_key.as_deref()?.trim();
        if key.is_empty() {
            return None;
        }
        let mut url = match Url::parse(key) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.inner.base_url.as_ref()?.join(key).ok()?
            }
            Err(err) => {
                log::debug!("Unusable poster key {key:?} for {}: {err}", item.id);
                return None;
            }
        };
        if let Some(token) = token {
            url.query_pairs_mut().append_pair(CACHE_BUST_PARAM, token);
        }
        Some(url.into())
    }

    /// Start background loads for the first `max_count` eligible items in
    /// feed order. Returns how many loads were started.
    pub fn prefetch_for(&self, items: &[FeedItem], max_count: usize) -> usize {
        if max_count == 0 {
            return 0;
        }

        let mut started = Vec::new();
        {
            let mut state = self.inner.state.lock();
            let token = state.cache_bust.clone();
            for item in items {
                if started.len() >= max_count {
                    break;
                }
                let key = &item.id;
                if key.is_synthetic()
                    || state.resolved.contains_key(key)
                    || state.inflight.contains_key(key)
                {
                    continue;
                }
                let Some(url) = self.derive_url(item, token.as_deref()) else {
                    continue;
                };

                let (canceller, cancelled) = oneshot::channel();
                let ticket = state.next_ticket;
                state.next_ticket += 1;
                state
                    .inflight
                    .insert(key.clone(), Inflight { ticket, canceller });
                started.push((key.clone(), url, ticket, cancelled));
            }
        }

        let mut count = 0;
        for (key, url, ticket, cancelled) in started {
            if self.spawn_load(key, url, ticket, cancelled) {
                count += 1;
            }
        }
        if count > 0 {
            log::debug!("Prefetching {count} preview(s)");
        }
        count
    }

    fn spawn_load(
        &self,
        key: ItemId,
        url: String,
        ticket: u64,
        cancelled: oneshot::Receiver<()>,
    ) -> bool {
        let loader = Arc::clone(&self.inner.loader);
        let weak = Arc::downgrade(&self.inner);
        let slot = key.clone();

        let spawned = self.inner.spawner.spawn("preview prefetch", async move {
            let outcome = tokio::select! {
                biased;
                _ = cancelled => None,
                result = loader.load(&url) => Some(result),
            };

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut state = inner.state.lock();
            let owns_slot = state
                .inflight
                .get(&key)
                .is_some_and(|inflight| inflight.ticket == ticket);
            if !owns_slot {
                log::trace!("Discarding detached prefetch for {key}");
                return;
            }
            state.inflight.remove(&key);

            match outcome {
                Some(Ok(())) => {
                    log::trace!("Prefetched preview for {key}");
                    state.insert_resolved(key, url, inner.capacity);
                }
                Some(Err(err)) => {
                    log::debug!("Preview prefetch failed for {key}: {err}");
                }
                None => {}
            }
        });

        if !spawned {
            let mut state = self.inner.state.lock();
            if state
                .inflight
                .get(&slot)
                .is_some_and(|inflight| inflight.ticket == ticket)
            {
                state.inflight.remove(&slot);
            }
        }
        spawned
    }

    /// Abort every in-flight load. Resolved entries are kept. Idempotent.
    pub fn cancel_inflight(&self) {
        let cancelled = self.inner.state.lock().cancel_all();
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} in-flight prefetch(es)");
        }
    }

    /// Resolved preview URL for `key`. Never starts a load.
    pub fn get(&self, key: &ItemId) -> Option<String> {
        if key.is_synthetic() {
            return None;
        }
        self.inner.state.lock().resolved.get(key).cloned()
    }

    /// Change the cache-bust token appended to derived URLs. A different
    /// token invalidates everything resolved or loading under the old one.
    pub fn set_cache_bust(&self, token: Option<String>) {
        let mut state = self.inner.state.lock();
        if state.cache_bust == token {
            return;
        }
        let cancelled = state.cancel_all();
        state.resolved.clear();
        state.order.clear();
        log::debug!(
            "Cache-bust token changed; dropped cache and {cancelled} in-flight load(s)"
        );
        state.cache_bust = token;
    }

    pub fn cache_bust(&self) -> Option<String> {
        self.inner.state.lock().cache_bust.clone()
    }

    pub fn is_inflight(&self, key: &ItemId) -> bool {
        self.inner.state.lock().inflight.contains_key(key)
    }

    pub fn inflight_len(&self) -> usize {
        self.inner.state.lock().inflight.len()
    }

    pub fn cached_len(&self) -> usize {
        self.inner.state.lock().resolved.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DeferredImageLoader, init_logging, settle};
    use reelfeed_contracts::error::ImageLoadError;

    const BASE: &str = "https://cdn.example.org/previews/";

    fn cache(loader: &Arc<DeferredImageLoader>, capacity: usize) -> PrefetchCache {
        init_logging();
        PrefetchCache::new(
            loader.clone(),
            capacity,
            Some(Url::parse(BASE).expect("base url")),
        )
    }

    fn item(id: &str) -> FeedItem {
        FeedItem::new(id).with_poster_key(format!("{id}.webp"))
    }

    #[test]
    fn urls_are_joined_and_cache_busted() {
        let loader = Arc::new(DeferredImageLoader::default());
        let cache = cache(&loader, 4);
        assert_eq!(
            cache.url_for(&item("m-1")).as_deref(),
            Some("https://cdn.example.org/previews/m-1.webp")
        );

        let absolute = FeedItem::new("m-2").with_poster_key("https://img.example.org/x.jpg");
        cache.set_cache_bust(Some("42".into()));
        assert_eq!(
            cache.url_for(&absolute).as_deref(),
            Some("https://img.example.org/x.jpg?t=42")
        );
        assert_eq!(cache.url_for(&FeedItem::new("m-3")), None);
    }

    #[test]
    fn relative_keys_need_a_base() {
        let loader = Arc::new(DeferredImageLoader::default());
        let cache = PrefetchCache::new(loader, 4, None);
        assert_eq!(cache.url_for(&item("m-1")), None);
    }

    #[tokio::test]
    async fn success_moves_key_from_inflight_to_cache() {
        let loader = Arc::new(DeferredImageLoader::default());
        let cache = cache(&loader, 4);

        assert_eq!(cache.prefetch_for(&[item("a"), item("b")], 8), 2);
        settle().await;
        assert!(cache.is_inflight(&"a".into()));
        assert_eq!(cache.get(&"a".into()), None);

        assert!(loader.complete(&format!("{BASE}a.webp"), Ok(())));
        settle().await;
        assert!(!cache.is_inflight(&"a".into()));
        assert_eq!(cache.get(&"a".into()), Some(format!("{BASE}a.webp")));
        assert!(cache.is_inflight(&"b".into()));
    }

    #[tokio::test]
    async fn failure_is_dropped_silently() {
        let loader = Arc::new(DeferredImageLoader::default());
        let cache = cache(&loader, 4);
        cache.prefetch_for(&[item("a")], 1);
        settle().await;

        loader.complete(&format!("{BASE}a.webp"), Err(ImageLoadError::Failed("404".into())));
        settle().await;
        assert_eq!(cache.inflight_len(), 0);
        assert_eq!(cache.cached_len(), 0);

        // Eligible again on the next pass.
        assert_eq!(cache.prefetch_for(&[item("a")], 1), 1);
    }

    #[tokio::test]
    async fn respects_max_count_and_skips_known_keys() {
        let loader = Arc::new(DeferredImageLoader::default());
        let cache = cache(&loader, 8);
        let items: Vec<_> = ["a", "b", "c", "d"].into_iter().map(item).collect();

        assert_eq!(cache.prefetch_for(&items, 2), 2);
        assert!(cache.is_inflight(&"a".into()));
        assert!(cache.is_inflight(&"b".into()));
        assert!(!cache.is_inflight(&"c".into()));

        assert_eq!(cache.prefetch_for(&items, 2), 2);
        assert!(cache.is_inflight(&"c".into()));
        assert!(cache.is_inflight(&"d".into()));
        assert_eq!(cache.prefetch_for(&items, 2), 0);
    }

    #[tokio::test]
    async fn capacity_drops_oldest_resolved() {
        let loader = Arc::new(DeferredImageLoader::immediate());
        let cache = cache(&loader, 2);

        cache.prefetch_for(&[item("a")], 1);
        settle().await;
        cache.prefetch_for(&[item("b")], 1);
        settle().await;
        cache.prefetch_for(&[item("c")], 1);
        settle().await;

        assert_eq!(cache.cached_len(), 2);
        assert_eq!(cache.get(&"a".into()), None);
        assert!(cache.get(&"b".into()).is_some());
        assert!(cache.get(&"c".into()).is_some());
    }

    #[tokio::test]
    async fn cache_bust_change_discards_everything() {
        let loader = Arc::new(DeferredImageLoader::default());
        let cache = cache(&loader, 4);
        cache.prefetch_for(&[item("a"), item("b")], 2);
        settle().await;
        loader.complete(&format!("{BASE}a.webp"), Ok(()));
        settle().await;
        assert_eq!(cache.cached_len(), 1);

        cache.set_cache_bust(Some("v2".into()));
        assert_eq!(cache.cached_len(), 0);
        assert_eq!(cache.inflight_len(), 0);
        settle().await;

        assert!(!loader.complete(&format!("{BASE}b.webp"), Ok(())));
        settle().await;
        assert_eq!(cache.get(&"b".into()), None);

        cache.prefetch_for(&[item("b")], 1);
        settle().await;
        assert!(loader.requested().contains(&format!("{BASE}b.webp?t=v2")));
    }
}
