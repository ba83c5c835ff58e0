//! Visibility-driven playback scheduler
//!
//! Tracks one entry per feed container, turns intersection batches into
//! enter/exit transitions and keeps at most `max_concurrent` ids admitted to
//! play. Handles are registered by the feed once they exist; this module
//! never builds them.
//!
//! Locking: the state mutex is held only while deciding. Every call out to a
//! handle or observer happens afterwards, so collaborators may call back into
//! the scheduler (including `cleanup`) from anywhere.

mod active_set;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use reelfeed_contracts::media::SharedMediaHandle;
use reelfeed_contracts::viewport::{
    IntersectionCallback, SharedObserver, Viewport,
};
use reelfeed_model::{
    ElementRef, IntersectionEntry, ItemId, ObserverOptions, RootMargin,
};

use self::active_set::ActiveSet;
use crate::infra::config::FeedConfig;
use crate::infra::constants::playback::PLAY_ATTEMPTS;
use crate::infra::spawner::Spawner;

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityOptions {
    pub max_concurrent: usize,
    /// Minimum intersection ratio that counts as visible.
    pub threshold: f32,
    pub auto_play: bool,
    pub play_retry_delay: Duration,
}

impl From<&FeedConfig> for VisibilityOptions {
    fn from(config: &FeedConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_videos.max(1),
            threshold: config.auto_play_threshold,
            auto_play: config.auto_play,
            play_retry_delay: config.play_retry_delay(),
        }
    }
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self::from(&FeedConfig::default())
    }
}

struct VisibilityEntry {
    /// Non-owning: the feed owns rendered containers.
    container: Weak<reelfeed_model::Element>,
    handle: Option<SharedMediaHandle>,
    is_visible: bool,
}

/// Side effects decided under the lock and run after it is released.
enum Effect {
    Play(ItemId, SharedMediaHandle),
    Pause(ItemId, SharedMediaHandle),
    Destroy(SharedMediaHandle),
    Observe(SharedObserver, ElementRef),
    Unobserve(SharedObserver, ElementRef),
    Disconnect(SharedObserver),
}

struct VisibilityState {
    options: VisibilityOptions,
    observer: Option<SharedObserver>,
    /// Bumped whenever the observer is replaced; batches from an older
    /// observer are dropped.
    observer_epoch: u64,
    entries: HashMap<ItemId, VisibilityEntry>,
    active: ActiveSet,
}

impl VisibilityState {
    fn observer_options(&self) -> ObserverOptions {
        let mut thresholds = vec![0.0];
        if self.options.threshold > 0.0 {
            thresholds.push(self.options.threshold);
        }
        ObserverOptions::new(thresholds, RootMargin::ZERO)
    }

    fn handle_of(&self, id: &ItemId) -> Option<SharedMediaHandle> {
        self.entries.get(id).and_then(|entry| entry.handle.clone())
    }

    fn apply_transition(
        &mut self,
        id: &ItemId,
        visible: bool,
        effects: &mut Vec<Effect>,
    ) {
        let Some(entry) = self.entries.get_mut(id) else {
            log::trace!("Intersection for untracked item {id}");
            return;
        };
        if entry.is_visible == visible {
            return;
        }
        entry.is_visible = visible;

        if visible {
            self.admit(id, effects);
        } else {
            if let Some(handle) = entry.handle.clone() {
                effects.push(Effect::Pause(id.clone(), handle));
            }
            if self.active.remove(id) {
                log::trace!("Item {id} left the viewport; slot released");
            }
        }
    }

    fn admit(&mut self, id: &ItemId, effects: &mut Vec<Effect>) {
        if self.active.contains(id) {
            return;
        }
        self.evict_to(self.options.max_concurrent.saturating_sub(1), effects);
        self.active.push(id.clone());

        match self.handle_of(id) {
            Some(handle) if self.options.auto_play => {
                effects.push(Effect::Play(id.clone(), handle));
            }
            Some(_) => {}
            None => {
                log::trace!("Item {id} admitted without a handle; slot reserved")
            }
        }
    }

    /// Evict oldest-admitted ids until at most `limit` remain.
    fn evict_to(&mut self, limit: usize, effects: &mut Vec<Effect>) {
        while self.active.len() > limit {
            let Some(oldest) = self.active.pop_oldest() else {
                break;
            };
            log::debug!("Evicting {oldest} to respect the playback ceiling");
            if let Some(handle) = self.handle_of(&oldest) {
                effects.push(Effect::Pause(oldest, handle));
            }
        }
    }

    fn is_current(&self, id: &ItemId, handle: &SharedMediaHandle) -> bool {
        self.options.auto_play
            && self.active.contains(id)
            && self
                .handle_of(id)
                .is_some_and(|current| Arc::ptr_eq(&current, handle))
    }
}

struct VisibilityInner {
    viewport: Arc<dyn Viewport>,
    spawner: Spawner,
    state: Mutex<VisibilityState>,
}

/// Admission/eviction scheduler for media playback. Cheap to clone; clones
/// share state.
#[derive(Clone)]
pub struct VisibilityScheduler {
    inner: Arc<VisibilityInner>,
}

impl fmt::Debug for VisibilityScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("VisibilityScheduler")
            .field("options", &state.options)
            .field("tracked", &state.entries.len())
            .field("active", &state.active)
            .finish()
    }
}

impl VisibilityScheduler {
    /// Build a scheduler that spawns `play()` calls on the runtime of the
    /// calling context.
    pub fn new(viewport: Arc<dyn Viewport>, options: VisibilityOptions) -> Self {
        Self::with_spawner(viewport, options, Spawner::capture())
    }

    pub fn with_spawner(
        viewport: Arc<dyn Viewport>,
        options: VisibilityOptions,
        spawner: Spawner,
    ) -> Self {
        Self {
            inner: Arc::new(VisibilityInner {
                viewport,
                spawner,
                state: Mutex::new(VisibilityState {
                    options,
                    observer: None,
                    observer_epoch: 0,
                    entries: HashMap::new(),
                    active: ActiveSet::default(),
                }),
            }),
        }
    }

    /// Begin intersection tracking for `item_id`. Returns false (and does
    /// nothing) if the id is already tracked.
    pub fn observe(&self, container: &ElementRef, item_id: &ItemId) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.entries.contains_key(item_id) {
                return false;
            }
            state.entries.insert(
                item_id.clone(),
                VisibilityEntry {
                    container: Arc::downgrade(container),
                    handle: None,
                    is_visible: false,
                },
            );
        }
        let observer = self.ensure_observer();
        observer.observe(container);
        log::trace!("Tracking visibility of {item_id}");
        true
    }

    /// Attach a media handle to a tracked entry. Returns false for an
    /// unknown id; the caller keeps ownership of the handle in that case.
    pub fn register_handle(
        &self,
        item_id: &ItemId,
        handle: SharedMediaHandle,
    ) -> bool {
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            let Some(entry) = state.entries.get_mut(item_id) else {
                log::warn!(
                    "Handle registered for untracked item {item_id}; ignoring"
                );
                return false;
            };
            if let Some(previous) = entry.handle.replace(Arc::clone(&handle))
                && !Arc::ptr_eq(&previous, &handle)
            {
                effects.push(Effect::Destroy(previous));
            }
            if state.options.auto_play && state.active.contains(item_id) {
                log::trace!("Late handle for active item {item_id}; playing");
                effects.push(Effect::Play(item_id.clone(), handle));
            }
        }
        self.run(effects);
        true
    }

    /// Stop tracking `item_id`, destroying its handle and freeing its slot.
    pub fn unobserve(&self, item_id: &ItemId) -> bool {
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            let Some(entry) = state.entries.remove(item_id) else {
                return false;
            };
            state.active.remove(item_id);
            if let (Some(observer), Some(container)) =
                (state.observer.clone(), entry.container.upgrade())
            {
                effects.push(Effect::Unobserve(observer, container));
            }
            if let Some(handle) = entry.handle {
                effects.push(Effect::Destroy(handle));
            }
        }
        self.run(effects);
        true
    }

    /// Destroy the handle of a tracked entry but keep tracking it. The id
    /// keeps its slot (as a reservation) if it is active.
    pub fn release_handle(&self, item_id: &ItemId) -> bool {
        let handle = {
            let mut state = self.inner.state.lock();
            state
                .entries
                .get_mut(item_id)
                .and_then(|entry| entry.handle.take())
        };
        match handle {
            Some(handle) => {
                log::debug!("Releasing player for {item_id}");
                self.run(vec![Effect::Destroy(handle)]);
                true
            }
            None => false,
        }
    }

    /// Disconnect observation, destroy every handle and clear all state.
    /// Idempotent.
    pub fn cleanup(&self) {
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            if let Some(observer) = state.observer.take() {
                effects.push(Effect::Disconnect(observer));
            }
            state.observer_epoch += 1;
            state.active.clear();
            for (_, entry) in state.entries.drain() {
                if let Some(handle) = entry.handle {
                    effects.push(Effect::Destroy(handle));
                }
            }
        }
        if !effects.is_empty() {
            log::debug!("Visibility scheduler cleaned up");
        }
        self.run(effects);
    }

    /// Process one intersection batch from the playback observer.
    pub fn handle_intersections(&self, batch: Vec<IntersectionEntry>) {
        let epoch = self.inner.state.lock().observer_epoch;
        self.process_batch(epoch, batch);
    }

    fn process_batch(&self, epoch: u64, batch: Vec<IntersectionEntry>) {
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            if state.observer_epoch != epoch {
                log::trace!("Dropping batch from a replaced observer");
                return;
            }
            let threshold = state.options.threshold;
            for entry in &batch {
                let Some(item_id) = entry.target.resolve_item_id() else {
                    log::trace!(
                        "Intersection target {} carries no item marker",
                        entry.target.id()
                    );
                    continue;
                };
                state.apply_transition(
                    &item_id,
                    entry.meets(threshold),
                    &mut effects,
                );
            }
        }
        self.run(effects);
    }

    // ========== SETTINGS ==========

    /// Change the ceiling. Shrinking evicts oldest-admitted ids.
    pub fn set_max_concurrent(&self, max_concurrent: usize) {
        let mut effects = Vec::new();
        {
            let mut state = self.inner.state.lock();
            state.options.max_concurrent = max_concurrent.max(1);
            let limit = state.options.max_concurrent;
            state.evict_to(limit, &mut effects);
        }
        self.run(effects);
    }

    /// Change the visibility threshold. The observer is rebuilt and every
    /// tracked container re-observed so the platform re-reports ratios.
    pub fn set_threshold(&self, threshold: f32) {
        let mut effects = Vec::new();
        let containers: Vec<ElementRef> = {
            let mut state = self.inner.state.lock();
            if state.options.threshold == threshold {
                return;
            }
            state.options.threshold = threshold;
            state.observer_epoch += 1;
            if let Some(observer) = state.observer.take() {
                effects.push(Effect::Disconnect(observer));
            }
            state
                .entries
                .values()
                .filter_map(|entry| entry.container.upgrade())
                .collect()
        };
        self.run(effects);

        if containers.is_empty() {
            return;
        }
        let observer = self.ensure_observer();
        self.run(
            containers
                .into_iter()
                .map(|container| Effect::Observe(Arc::clone(&observer), container))
                .collect(),
        );
    }

    /// Toggle autoplay. Active ids stay admitted either way; their handles
    /// are paused or played to match.
    pub fn set_auto_play(&self, auto_play: bool) {
        let effects: Vec<Effect> = {
            let mut state = self.inner.state.lock();
            if state.options.auto_play == auto_play {
                return;
            }
            state.options.auto_play = auto_play;
            state
                .active
                .iter()
                .filter_map(|id| {
                    state.handle_of(id).map(|handle| {
                        if auto_play {
                            Effect::Play(id.clone(), handle)
                        } else {
                            Effect::Pause(id.clone(), handle)
                        }
                    })
                })
                .collect()
        };
        self.run(effects);
    }

    pub fn options(&self) -> VisibilityOptions {
        self.inner.state.lock().options.clone()
    }

    // ========== INSPECTION ==========

    /// Active ids, oldest admission first.
    pub fn active_ids(&self) -> Vec<ItemId> {
        self.inner.state.lock().active.iter().cloned().collect()
    }

    pub fn is_active(&self, item_id: &ItemId) -> bool {
        self.inner.state.lock().active.contains(item_id)
    }

    pub fn is_visible(&self, item_id: &ItemId) -> bool {
        self.inner
            .state
            .lock()
            .entries
            .get(item_id)
            .is_some_and(|entry| entry.is_visible)
    }

    pub fn is_tracked(&self, item_id: &ItemId) -> bool {
        self.inner.state.lock().entries.contains_key(item_id)
    }

    pub fn has_handle(&self, item_id: &ItemId) -> bool {
        self.inner.state.lock().handle_of(item_id).is_some()
    }

    pub fn tracked_count(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    // ========== INTERNALS ==========

    fn ensure_observer(&self) -> SharedObserver {
        let (options, epoch) = {
            let state = self.inner.state.lock();
            if let Some(observer) = &state.observer {
                return Arc::clone(observer);
            }
            (state.observer_options(), state.observer_epoch)
        };

        let weak = Arc::downgrade(&self.inner);
        let callback: IntersectionCallback = Arc::new(move |batch| {
            if let Some(inner) = weak.upgrade() {
                VisibilityScheduler { inner }.process_batch(epoch, batch);
            }
        });
        let created = self.inner.viewport.create_observer(options, callback);

        let mut state = self.inner.state.lock();
        if let Some(existing) = state.observer.clone() {
            drop(state);
            created.disconnect();
            return existing;
        }
        state.observer = Some(Arc::clone(&created));
        created
    }

    fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Play(id, handle) => self.spawn_play(id, handle),
                Effect::Pause(id, handle) => {
                    log::trace!("Pausing {id}");
                    handle.pause();
                }
                Effect::Destroy(handle) => handle.destroy(),
                Effect::Observe(observer, container) => {
                    observer.observe(&container)
                }
                Effect::Unobserve(observer, container) => {
                    observer.unobserve(&container)
                }
                Effect::Disconnect(observer) => observer.disconnect(),
            }
        }
    }

    /// Run `play()` off the callback path. A rejection is retried once after
    /// the configured delay; each completion re-checks that the id is still
    /// admitted with the same handle before its result is kept.
    fn spawn_play(&self, id: ItemId, handle: SharedMediaHandle) {
        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.state.lock().options.play_retry_delay;

        self.inner.spawner.spawn("play", async move {
            for attempt in 1..=PLAY_ATTEMPTS {
                let result = handle.play().await;

                let current = weak.upgrade().is_some_and(|inner| {
                    inner.state.lock().is_current(&id, &handle)
                });

                match result {
                    Ok(()) => {
                        if !current {
                            log::trace!(
                                "Play for {id} resolved after eviction; pausing"
                            );
                            handle.pause();
                        }
                        return;
                    }
                    Err(err) if attempt < PLAY_ATTEMPTS && current => {
                        log::warn!(
                            "Play rejected for {id} ({err}); retrying in {delay:?}"
                        );
                        tokio::time::sleep(delay).await;
                        let still_current = weak.upgrade().is_some_and(|inner| {
                            inner.state.lock().is_current(&id, &handle)
                        });
                        if !still_current {
                            log::trace!("Dropping play retry for {id}");
                            return;
                        }
                    }
                    Err(err) => {
                        log::debug!("Leaving {id} paused after play failure: {err}");
                        return;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeMediaHandle, FakeViewport, init_logging, settle};
    use reelfeed_model::Element;

    struct Fixture {
        viewport: Arc<FakeViewport>,
        scheduler: VisibilityScheduler,
    }

    fn fixture(max_concurrent: usize) -> Fixture {
        init_logging();
        let viewport = Arc::new(FakeViewport::default());
        let scheduler = VisibilityScheduler::new(
            viewport.clone(),
            VisibilityOptions {
                max_concurrent,
                threshold: 0.5,
                auto_play: true,
                play_retry_delay: Duration::from_millis(250),
            },
        );
        Fixture {
            viewport,
            scheduler,
        }
    }

    fn track(fx: &Fixture, id: &str) -> (ElementRef, Arc<FakeMediaHandle>) {
        let container = Element::container(ItemId::from(id));
        fx.scheduler.observe(&container, &ItemId::from(id));
        let handle = Arc::new(FakeMediaHandle::new(id));
        assert!(fx.scheduler.register_handle(&ItemId::from(id), handle.clone()));
        (container, handle)
    }

    #[tokio::test]
    async fn observe_is_idempotent() {
        let fx = fixture(2);
        let container = Element::container("a".into());
        assert!(fx.scheduler.observe(&container, &"a".into()));
        assert!(!fx.scheduler.observe(&container, &"a".into()));
        assert_eq!(fx.scheduler.tracked_count(), 1);
        assert_eq!(fx.viewport.live_observers(RootMargin::ZERO).len(), 1);
    }

    #[tokio::test]
    async fn fifo_eviction_pauses_oldest() {
        let fx = fixture(2);
        let (a, handle_a) = track(&fx, "a");
        let (b, handle_b) = track(&fx, "b");
        let (c, handle_c) = track(&fx, "c");

        fx.viewport.show(RootMargin::ZERO, &a, 1.0);
        fx.viewport.show(RootMargin::ZERO, &b, 0.9);
        fx.viewport.show(RootMargin::ZERO, &c, 0.6);
        settle().await;

        assert_eq!(fx.scheduler.active_ids(), vec!["b".into(), "c".into()]);
        assert!(!handle_a.is_playing());
        assert!(handle_a.pause_calls() >= 1);
        assert!(handle_b.is_playing());
        assert!(handle_c.is_playing());
    }

    #[tokio::test]
    async fn redundant_callbacks_do_not_replay() {
        let fx = fixture(2);
        let (a, handle_a) = track(&fx, "a");

        fx.viewport.show(RootMargin::ZERO, &a, 1.0);
        fx.viewport.show(RootMargin::ZERO, &a, 0.8);
        settle().await;

        assert_eq!(handle_a.play_calls(), 1);
    }

    #[tokio::test]
    async fn below_threshold_counts_as_exit() {
        let fx = fixture(2);
        let (a, handle_a) = track(&fx, "a");

        fx.viewport.show(RootMargin::ZERO, &a, 0.9);
        settle().await;
        fx.viewport.show(RootMargin::ZERO, &a, 0.2);
        settle().await;

        assert!(!fx.scheduler.is_active(&"a".into()));
        assert!(!fx.scheduler.is_visible(&"a".into()));
        assert!(!handle_a.is_playing());
    }

    #[tokio::test]
    async fn nested_target_resolves_to_container() {
        let fx = fixture(1);
        let (a, handle_a) = track(&fx, "a");
        let poster = Element::child_of(&a);

        fx.viewport.emit(
            RootMargin::ZERO,
            vec![IntersectionEntry::new(poster, true, 1.0)],
        );
        settle().await;

        assert!(fx.scheduler.is_active(&"a".into()));
        assert!(handle_a.is_playing());
    }

    #[tokio::test]
    async fn late_handle_consumes_reservation() {
        let fx = fixture(1);
        let container = Element::container("a".into());
        fx.scheduler.observe(&container, &"a".into());

        fx.viewport.show(RootMargin::ZERO, &container, 1.0);
        settle().await;
        assert!(fx.scheduler.is_active(&"a".into()));

        let handle = Arc::new(FakeMediaHandle::new("a"));
        fx.scheduler.register_handle(&"a".into(), handle.clone());
        settle().await;
        assert!(handle.is_playing());
    }

    #[tokio::test]
    async fn unknown_registration_is_rejected() {
        let fx = fixture(1);
        let handle = Arc::new(FakeMediaHandle::new("ghost"));
        assert!(!fx.scheduler.register_handle(&"ghost".into(), handle.clone()));
        assert!(!handle.is_destroyed(), "caller owns a rejected handle");
    }

    #[tokio::test]
    async fn replaced_handle_is_destroyed() {
        let fx = fixture(1);
        let (_a, first) = track(&fx, "a");
        let second = Arc::new(FakeMediaHandle::new("a"));
        fx.scheduler.register_handle(&"a".into(), second.clone());
        assert!(first.is_destroyed());
        assert!(!second.is_destroyed());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_play_is_retried_once() {
        let fx = fixture(1);
        let (a, handle_a) = track(&fx, "a");
        handle_a.fail_next_plays(5);

        fx.viewport.show(RootMargin::ZERO, &a, 1.0);
        settle().await;
        assert_eq!(handle_a.play_calls(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        settle().await;
        assert_eq!(handle_a.play_calls(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(handle_a.play_calls(), 2, "no third attempt");
        assert!(!handle_a.is_playing());
        assert!(fx.scheduler.is_active(&"a".into()), "failure is not fatal");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_succeeds_after_single_rejection() {
        let fx = fixture(1);
        let (a, handle_a) = track(&fx, "a");
        handle_a.fail_next_plays(1);

        fx.viewport.show(RootMargin::ZERO, &a, 1.0);
        settle().await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        settle().await;

        assert!(handle_a.is_playing());
    }

    #[tokio::test]
    async fn stale_play_completion_is_paused() {
        let fx = fixture(1);
        let (a, handle_a) = track(&fx, "a");
        let (b, _handle_b) = track(&fx, "b");
        let release = handle_a.hold_next_play();

        fx.viewport.show(RootMargin::ZERO, &a, 1.0);
        settle().await;
        fx.viewport.show(RootMargin::ZERO, &b, 1.0);
        settle().await;
        assert!(!fx.scheduler.is_active(&"a".into()));

        let _ = release.send(());
        settle().await;
        assert!(!handle_a.is_playing(), "evicted handle must not keep playing");
    }

    #[tokio::test]
    async fn shrinking_ceiling_evicts_oldest() {
        let fx = fixture(3);
        let (a, handle_a) = track(&fx, "a");
        let (b, handle_b) = track(&fx, "b");
        let (c, _) = track(&fx, "c");
        for el in [&a, &b, &c] {
            fx.viewport.show(RootMargin::ZERO, el, 1.0);
        }
        settle().await;

        fx.scheduler.set_max_concurrent(1);
        assert_eq!(fx.scheduler.active_ids(), vec!["c".into()]);
        assert!(!handle_a.is_playing());
        assert!(!handle_b.is_playing());
    }

    #[tokio::test]
    async fn threshold_change_rebuilds_observer() {
        let fx = fixture(2);
        let (a, _) = track(&fx, "a");
        let first = fx.viewport.live_observers(RootMargin::ZERO);
        assert_eq!(first.len(), 1);

        fx.scheduler.set_threshold(0.9);
        assert!(first[0].is_disconnected());
        let live = fx.viewport.live_observers(RootMargin::ZERO);
        assert_eq!(live.len(), 1);
        assert!(live[0].is_observing(&a));
        assert!(live[0].options().thresholds.contains(&0.9));

        // 0.6 no longer qualifies.
        fx.viewport.show(RootMargin::ZERO, &a, 0.6);
        settle().await;
        assert!(!fx.scheduler.is_active(&"a".into()));
    }

    #[tokio::test]
    async fn disabling_autoplay_pauses_active_handles() {
        let fx = fixture(2);
        let (a, handle_a) = track(&fx, "a");
        fx.viewport.show(RootMargin::ZERO, &a, 1.0);
        settle().await;
        assert!(handle_a.is_playing());

        fx.scheduler.set_auto_play(false);
        assert!(!handle_a.is_playing());
        assert!(fx.scheduler.is_active(&"a".into()));
    }

    #[tokio::test]
    async fn cleanup_is_idempotent_and_reentrant() {
        let fx = fixture(2);
        let (a, handle_a) = track(&fx, "a");
        fx.viewport.show(RootMargin::ZERO, &a, 1.0);
        settle().await;

        // A handle whose destroy re-enters cleanup must not deadlock.
        let scheduler = fx.scheduler.clone();
        handle_a.on_destroy(move || scheduler.cleanup());

        fx.scheduler.cleanup();
        fx.scheduler.cleanup();
        assert!(handle_a.is_destroyed());
        assert_eq!(fx.scheduler.tracked_count(), 0);
        assert!(fx.scheduler.active_ids().is_empty());
        assert!(fx.viewport.live_observers(RootMargin::ZERO).is_empty());
    }

    #[tokio::test]
    async fn unobserve_destroys_and_frees_slot() {
        let fx = fixture(1);
        let (a, handle_a) = track(&fx, "a");
        fx.viewport.show(RootMargin::ZERO, &a, 1.0);
        settle().await;

        assert!(fx.scheduler.unobserve(&"a".into()));
        assert!(handle_a.is_destroyed());
        assert!(fx.scheduler.active_ids().is_empty());
        assert!(!fx.viewport.live_observers(RootMargin::ZERO)[0].is_observing(&a));
        assert!(!fx.scheduler.unobserve(&"a".into()));
    }
}
