use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use reelfeed_contracts::viewport::{IntersectionCallback, SharedObserver};
use reelfeed_model::{
    ElementRef, FeedFilters, FeedItem, ItemId, ObserverOptions, RootMargin,
    SettingsUpdate,
};

use super::pagination::{Pagination, PaginationState};
use super::{FeedCollaborators, LoadOutcome, SkipReason};
use crate::error::{FeedError, Result};
use crate::infra::config::FeedConfig;
use crate::infra::runtime_config::RuntimeConfig;
use crate::infra::spawner::Spawner;
use crate::prefetch::PrefetchCache;
use crate::visibility::{VisibilityOptions, VisibilityScheduler};

struct RenderedItem {
    item: FeedItem,
    container: ElementRef,
    /// One-shot pre-roll trigger; `None` once fired or for unplayable items.
    materializer: Option<SharedObserver>,
    /// Distance-based release trigger for a materialized handle.
    retainer: Option<SharedObserver>,
    materialized: bool,
}

struct FeedState {
    settings: RuntimeConfig,
    filters: FeedFilters,
    order: Vec<ItemId>,
    rendered: HashMap<ItemId, RenderedItem>,
    pagination: Pagination,
    tail_observer: Option<SharedObserver>,
    shut_down: bool,
}

struct FeedInner {
    collaborators: FeedCollaborators,
    visibility: VisibilityScheduler,
    prefetch: PrefetchCache,
    spawner: Spawner,
    state: Mutex<FeedState>,
}

#[derive(Clone, Copy)]
enum FetchKind {
    First,
    More,
}

/// Restores the pagination state machine if a fetch does not finish
/// normally, including when the awaiting future is dropped.
struct FetchGuard<'a> {
    inner: &'a FeedInner,
    generation: u64,
    kind: FetchKind,
    armed: bool,
}

impl<'a> FetchGuard<'a> {
    fn new(inner: &'a FeedInner, generation: u64, kind: FetchKind) -> Self {
        Self {
            inner,
            generation,
            kind,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.state.lock();
        match self.kind {
            FetchKind::First => state.pagination.fail_load(self.generation),
            FetchKind::More => state.pagination.fail_more(self.generation),
        }
    }
}

/// Composition root of the feed: owns the item list and pagination cursor,
/// materializes media handles as items near the viewport and hands them to
/// the [`VisibilityScheduler`].
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct FeedScheduler {
    inner: Arc<FeedInner>,
}

impl fmt::Debug for FeedScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("FeedScheduler")
            .field("items", &state.order.len())
            .field("pagination", &state.pagination)
            .field("filters", &state.filters)
            .field("shut_down", &state.shut_down)
            .finish()
    }
}

impl FeedScheduler {
    /// Build a feed whose background work (page fetches from the tail
    /// trigger, `play()` calls) runs on the runtime of the calling context.
    pub fn new(
        config: FeedConfig,
        collaborators: FeedCollaborators,
        prefetch: PrefetchCache,
    ) -> Result<Self> {
        Self::with_spawner(config, collaborators, prefetch, Spawner::capture())
    }

    pub fn with_spawner(
        config: FeedConfig,
        collaborators: FeedCollaborators,
        prefetch: PrefetchCache,
        spawner: Spawner,
    ) -> Result<Self> {
        config.validate()?;
        let visibility = VisibilityScheduler::with_spawner(
            Arc::clone(&collaborators.viewport),
            VisibilityOptions::from(&config),
            spawner.clone(),
        );
        Ok(Self {
            inner: Arc::new(FeedInner {
                collaborators,
                visibility,
                prefetch,
                spawner,
                state: Mutex::new(FeedState {
                    settings: RuntimeConfig::new(config),
                    filters: FeedFilters::default(),
                    order: Vec::new(),
                    rendered: HashMap::new(),
                    pagination: Pagination::default(),
                    tail_observer: None,
                    shut_down: false,
                }),
            }),
        })
    }

    fn from_inner(inner: Arc<FeedInner>) -> Self {
        Self { inner }
    }

    // ========== PAGINATION ==========

    /// Replace the feed with page 1 for `filters`.
    ///
    /// A second `load` while one is in flight is skipped. A failure on this
    /// first page is shown on the surface and returned; the feed is left
    /// empty and idle.
    pub async fn load(&self, filters: FeedFilters) -> Result<LoadOutcome> {
        let (generation, page_size) = {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                return Ok(LoadOutcome::Skipped(SkipReason::Superseded));
            }
            let Some(generation) = state.pagination.begin_load() else {
                log::debug!("Load already in flight; ignoring");
                return Ok(LoadOutcome::Skipped(SkipReason::InFlight));
            };
            state.filters = filters.clone();
            (generation, state.settings.page_size())
        };

        log::debug!("Loading feed ({filters})");
        self.clear_items();
        self.inner.collaborators.surface.clear_error();

        let guard = FetchGuard::new(&self.inner, generation, FetchKind::First);
        let fetched = self
            .inner
            .collaborators
            .fetcher
            .fetch_page(&filters, page_size, 1)
            .await;

        match fetched {
            Ok(items) => {
                let received = items.len();
                {
                    let mut state = self.inner.state.lock();
                    if state.pagination.generation() != generation {
                        log::debug!("Discarding superseded first page");
                        return Ok(LoadOutcome::Skipped(SkipReason::Superseded));
                    }
                    state.pagination.finish_load(received, page_size);
                }
                guard.disarm();

                let appended = self.append(items);
                self.ensure_tail_observer();
                log::debug!(
                    "First page: {received} received, {appended} appended"
                );
                Ok(LoadOutcome::Appended(appended))
            }
            Err(err) => {
                drop(guard);
                log::warn!("Failed to load feed: {err}");
                self.inner.collaborators.surface.show_error(&err.to_string());
                Err(FeedError::Fetch(err))
            }
        }
    }

    /// Fetch and append the next page. Never fails: errors are logged and
    /// the next tail intersection tries again.
    pub async fn load_more(&self) -> LoadOutcome {
        let (generation, page, filters, page_size) = {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                return LoadOutcome::Skipped(SkipReason::Superseded);
            }
            if state.pagination.state().is_loading() {
                log::trace!("Page fetch already in flight; ignoring tail trigger");
                return LoadOutcome::Skipped(SkipReason::InFlight);
            }
            let Some((generation, page)) = state.pagination.begin_more() else {
                return LoadOutcome::Skipped(SkipReason::Exhausted);
            };
            (
                generation,
                page,
                state.filters.clone(),
                state.settings.page_size(),
            )
        };

        log::debug!("Loading page {page}");
        let guard = FetchGuard::new(&self.inner, generation, FetchKind::More);
        let fetched = self
            .inner
            .collaborators
            .fetcher
            .fetch_page(&filters, page_size, page)
            .await;

        match fetched {
            Ok(items) => {
                let received = items.len();
                let current = self.inner.state.lock().pagination.finish_more(
                    generation,
                    received,
                    page_size,
                );
                guard.disarm();
                if !current {
                    log::debug!("Discarding page {page} from a superseded load");
                    return LoadOutcome::Skipped(SkipReason::Superseded);
                }
                if received < page_size {
                    log::debug!("Page {page} was short; feed exhausted");
                }
                LoadOutcome::Appended(self.append(items))
            }
            Err(err) => {
                drop(guard);
                log::warn!("Failed to load page {page}: {err}");
                LoadOutcome::Failed
            }
        }
    }

    // ========== ITEMS ==========

    /// Render `items` at the tail of the feed and begin tracking them.
    /// Items whose id is already in the feed are dropped. Returns how many
    /// were appended.
    pub fn append(&self, items: Vec<FeedItem>) -> usize {
        let fresh: Vec<FeedItem> = {
            let state = self.inner.state.lock();
            if state.shut_down {
                return 0;
            }
            let mut seen = std::collections::HashSet::new();
            items
                .into_iter()
                .filter(|item| {
                    let duplicate = state.rendered.contains_key(&item.id)
                        || !seen.insert(item.id.clone());
                    if duplicate {
                        log::debug!("Dropping duplicate feed item {}", item.id);
                    }
                    !duplicate
                })
                .collect()
        };
        if fresh.is_empty() {
            return 0;
        }

        let surface = &self.inner.collaborators.surface;
        for item in &fresh {
            let container = surface.append_container(item);
            {
                let mut state = self.inner.state.lock();
                state.order.push(item.id.clone());
                state.rendered.insert(
                    item.id.clone(),
                    RenderedItem {
                        item: item.clone(),
                        container: Arc::clone(&container),
                        materializer: None,
                        retainer: None,
                        materialized: false,
                    },
                );
            }
            if item.is_playable() {
                self.inner.visibility.observe(&container, &item.id);
                self.arm_materializer(&item.id);
            }
        }
        surface.move_sentinel_to_end();
        self.rearm_tail_observer();

        let prefetch_count = self.inner.state.lock().settings.prefetch_count();
        self.inner.prefetch.prefetch_for(&fresh, prefetch_count);
        fresh.len()
    }

    /// Reset pagination and remove every item. An in-flight fetch is
    /// discarded when it completes.
    pub fn clear(&self) {
        self.inner.state.lock().pagination.reset();
        self.clear_items();
    }

    /// Remove every item without touching pagination.
    fn clear_items(&self) {
        let removed: Vec<RenderedItem> = {
            let mut state = self.inner.state.lock();
            let order = std::mem::take(&mut state.order);
            order
                .into_iter()
                .filter_map(|id| state.rendered.remove(&id))
                .collect()
        };

        for rendered in &removed {
            if let Some(observer) = &rendered.materializer {
                observer.disconnect();
            }
            if let Some(observer) = &rendered.retainer {
                observer.disconnect();
            }
            self.inner.visibility.unobserve(&rendered.item.id);
            self.inner
                .collaborators
                .surface
                .remove_container(&rendered.container);
        }
        self.inner.prefetch.cancel_inflight();
        if !removed.is_empty() {
            log::debug!("Cleared {} feed item(s)", removed.len());
        }
    }

    /// Tear everything down: items, tail trigger and playback tracking.
    /// Later loads are ignored. Idempotent.
    pub fn shutdown(&self) {
        let tail = {
            let mut state = self.inner.state.lock();
            state.shut_down = true;
            state.tail_observer.take()
        };
        self.clear();
        if let Some(observer) = tail {
            observer.disconnect();
        }
        self.inner.visibility.cleanup();
    }

    // ========== SETTINGS ==========

    /// Apply user-adjustable settings. Invalid values are rejected as a
    /// whole and nothing changes.
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<()> {
        let (delta, settings) = {
            let mut state = self.inner.state.lock();
            let delta = state.settings.apply(update)?;
            (delta, state.settings.clone())
        };
        if !delta.any() {
            return Ok(());
        }
        log::debug!("Applying settings update {update:?}");

        let visibility = &self.inner.visibility;
        if delta.max_concurrent_videos {
            visibility.set_max_concurrent(settings.max_concurrent_videos());
        }
        if delta.auto_play_threshold {
            visibility.set_threshold(settings.auto_play_threshold());
        }
        if delta.auto_play {
            visibility.set_auto_play(settings.auto_play());
        }
        if delta.unload_distance {
            self.rearm_retainers();
        }
        Ok(())
    }

    // ========== TRIGGERS ==========

    fn observer(
        &self,
        margin: RootMargin,
        on_batch: impl Fn(&FeedScheduler, Vec<reelfeed_model::IntersectionEntry>)
        + Send
        + Sync
        + 'static,
    ) -> SharedObserver {
        let weak: Weak<FeedInner> = Arc::downgrade(&self.inner);
        let callback: IntersectionCallback = Arc::new(move |batch| {
            if let Some(inner) = weak.upgrade() {
                on_batch(&FeedScheduler::from_inner(inner), batch);
            }
        });
        self.inner
            .collaborators
            .viewport
            .create_observer(ObserverOptions::proximity(margin), callback)
    }

    /// Watch the tail sentinel with the pagination margin. Entering the band
    /// requests the next page.
    fn ensure_tail_observer(&self) {
        let margin = {
            let state = self.inner.state.lock();
            if state.tail_observer.is_some() || state.shut_down {
                return;
            }
            state.settings.pagination_margin()
        };

        let observer = self.observer(margin, |feed, batch| {
            if batch.iter().any(|entry| entry.is_intersecting) {
                let next = feed.clone();
                feed.inner.spawner.spawn("next page fetch", async move {
                    next.load_more().await;
                });
            }
        });

        {
            let mut state = self.inner.state.lock();
            if state.tail_observer.is_some() {
                drop(state);
                observer.disconnect();
                return;
            }
            state.tail_observer = Some(Arc::clone(&observer));
        }
        observer.observe(&self.inner.collaborators.surface.sentinel());
    }

    /// Re-observe the sentinel so one that is still inside the band after an
    /// append reports again.
    fn rearm_tail_observer(&self) {
        let tail = self.inner.state.lock().tail_observer.clone();
        if let Some(observer) = tail {
            let sentinel = self.inner.collaborators.surface.sentinel();
            observer.unobserve(&sentinel);
            observer.observe(&sentinel);
        }
    }

    /// Give `item_id` a one-shot pre-roll trigger that builds its media
    /// handle.
    fn arm_materializer(&self, item_id: &ItemId) {
        let (margin, container) = {
            let state = self.inner.state.lock();
            let Some(rendered) = state.rendered.get(item_id) else {
                return;
            };
            if rendered.materialized || rendered.materializer.is_some() {
                return;
            }
            (
                state.settings.preroll_margin(),
                Arc::clone(&rendered.container),
            )
        };

        let id = item_id.clone();
        let observer = self.observer(margin, move |feed, batch| {
            if batch.iter().any(|entry| entry.is_intersecting) {
                feed.materialize(&id);
            }
        });

        let installed = {
            let mut state = self.inner.state.lock();
            match state.rendered.get_mut(item_id) {
                Some(rendered) if rendered.materializer.is_none() => {
                    rendered.materializer = Some(Arc::clone(&observer));
                    true
                }
                _ => false,
            }
        };
        if !installed {
            observer.disconnect();
            return;
        }
        observer.observe(&container);
    }

    fn materialize(&self, item_id: &ItemId) {
        let (item, trigger) = {
            let mut state = self.inner.state.lock();
            let Some(rendered) = state.rendered.get_mut(item_id) else {
                return;
            };
            if rendered.materialized {
                return;
            }
            rendered.materialized = true;
            (rendered.item.clone(), rendered.materializer.take())
        };
        if let Some(observer) = trigger {
            observer.disconnect();
        }
        self.prefetch_after(item_id);

        let Some(url) = item.media_url.as_deref() else {
            return;
        };
        let handle = match self.inner.collaborators.factory.create(
            url,
            item.start_offset,
            item.end_offset,
        ) {
            Ok(handle) => handle,
            Err(err) => {
                log::warn!("Could not create player for {}: {err}", item.id);
                self.retry_materialize(item_id);
                return;
            }
        };

        log::trace!("Materialized player for {}", item.id);
        if !self
            .inner
            .visibility
            .register_handle(&item.id, Arc::clone(&handle))
        {
            handle.destroy();
            self.retry_materialize(item_id);
            return;
        }
        self.arm_retainer(item_id);
    }

    /// Put a failed item back behind its pre-roll trigger so the next
    /// intersection tries again.
    fn retry_materialize(&self, item_id: &ItemId) {
        {
            let mut state = self.inner.state.lock();
            let Some(rendered) = state.rendered.get_mut(item_id) else {
                return;
            };
            rendered.materialized = false;
        }
        self.arm_materializer(item_id);
    }

    /// Warm previews for the items following `item_id`, which just came
    /// within pre-roll distance.
    fn prefetch_after(&self, item_id: &ItemId) {
        let (upcoming, count) = {
            let state = self.inner.state.lock();
            let count = state.settings.prefetch_count();
            let Some(position) = state.order.iter().position(|id| id == item_id)
            else {
                return;
            };
            let upcoming: Vec<FeedItem> = state.order[position + 1..]
                .iter()
                .take(count)
                .filter_map(|id| state.rendered.get(id).map(|r| r.item.clone()))
                .collect();
            (upcoming, count)
        };
        if !upcoming.is_empty() {
            self.inner.prefetch.prefetch_for(&upcoming, count);
        }
    }

    /// Release the handle of `item_id` once it leaves the unload band. No-op
    /// when distance-based unloading is off.
    fn arm_retainer(&self, item_id: &ItemId) {
        let (margin, container) = {
            let state = self.inner.state.lock();
            let Some(margin) = state.settings.unload_margin() else {
                return;
            };
            let Some(rendered) = state.rendered.get(item_id) else {
                return;
            };
            if !rendered.materialized || rendered.retainer.is_some() {
                return;
            }
            (margin, Arc::clone(&rendered.container))
        };

        let id = item_id.clone();
        let observer = self.observer(margin, move |feed, batch| {
            if batch.iter().any(|entry| !entry.is_intersecting) {
                feed.release(&id);
            }
        });

        let installed = {
            let mut state = self.inner.state.lock();
            match state.rendered.get_mut(item_id) {
                Some(rendered) if rendered.retainer.is_none() => {
                    rendered.retainer = Some(Arc::clone(&observer));
                    true
                }
                _ => false,
            }
        };
        if !installed {
            observer.disconnect();
            return;
        }
        observer.observe(&container);
    }

    fn release(&self, item_id: &ItemId) {
        let retainer = {
            let mut state = self.inner.state.lock();
            let Some(rendered) = state.rendered.get_mut(item_id) else {
                return;
            };
            if !rendered.materialized {
                return;
            }
            rendered.materialized = false;
            rendered.retainer.take()
        };
        if let Some(observer) = retainer {
            observer.disconnect();
        }
        log::debug!("{item_id} moved past the unload distance");
        self.inner.visibility.release_handle(item_id);
        self.arm_materializer(item_id);
    }

    fn rearm_retainers(&self) {
        let (stale, materialized): (Vec<SharedObserver>, Vec<ItemId>) = {
            let mut state = self.inner.state.lock();
            let mut stale = Vec::new();
            let mut materialized = Vec::new();
            for (id, rendered) in state.rendered.iter_mut() {
                stale.extend(rendered.retainer.take());
                if rendered.materialized {
                    materialized.push(id.clone());
                }
            }
            (stale, materialized)
        };
        for observer in stale {
            observer.disconnect();
        }
        for id in &materialized {
            self.arm_retainer(id);
        }
    }

    // ========== INSPECTION ==========

    pub fn visibility(&self) -> &VisibilityScheduler {
        &self.inner.visibility
    }

    pub fn prefetch(&self) -> &PrefetchCache {
        &self.inner.prefetch
    }

    /// Items in feed order.
    pub fn items(&self) -> Vec<FeedItem> {
        let state = self.inner.state.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.rendered.get(id).map(|r| r.item.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_more(&self) -> bool {
        self.inner.state.lock().pagination.has_more()
    }

    pub fn state(&self) -> PaginationState {
        self.inner.state.lock().pagination.state()
    }

    /// Last successfully fetched page (1-based), zero before any.
    pub fn page(&self) -> usize {
        self.inner.state.lock().pagination.page()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    pub fn filters(&self) -> FeedFilters {
        self.inner.state.lock().filters.clone()
    }

    pub fn settings(&self) -> RuntimeConfig {
        self.inner.state.lock().settings.clone()
    }

    pub fn is_materialized(&self, item_id: &ItemId) -> bool {
        self.inner
            .state
            .lock()
            .rendered
            .get(item_id)
            .is_some_and(|rendered| rendered.materialized)
    }

    pub fn container(&self, item_id: &ItemId) -> Option<ElementRef> {
        self.inner
            .state
            .lock()
            .rendered
            .get(item_id)
            .map(|rendered| Arc::clone(&rendered.container))
    }
}
