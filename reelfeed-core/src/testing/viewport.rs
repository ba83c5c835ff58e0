use std::sync::Arc;

use parking_lot::Mutex;
use reelfeed_contracts::viewport::{
    IntersectionCallback, IntersectionObserver, SharedObserver, Viewport,
};
use reelfeed_model::{ElementRef, IntersectionEntry, ObserverOptions, RootMargin};

pub struct FakeObserver {
    options: ObserverOptions,
    callback: IntersectionCallback,
    targets: Mutex<Vec<ElementRef>>,
    disconnected: Mutex<bool>,
}

impl std::fmt::Debug for FakeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeObserver")
            .field("options", &self.options)
            .field("targets", &self.targets.lock().len())
            .field("disconnected", &*self.disconnected.lock())
            .finish()
    }
}

impl FakeObserver {
    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    pub fn is_observing(&self, target: &ElementRef) -> bool {
        self.targets
            .lock()
            .iter()
            .any(|observed| Arc::ptr_eq(observed, target))
    }

    pub fn observed_count(&self) -> usize {
        self.targets.lock().len()
    }

    pub fn is_disconnected(&self) -> bool {
        *self.disconnected.lock()
    }

    /// Whether `target` is an observed element or sits inside one.
    fn covers(&self, target: &ElementRef) -> bool {
        let targets = self.targets.lock();
        let mut current = Some(target);
        while let Some(element) = current {
            if targets.iter().any(|observed| Arc::ptr_eq(observed, element)) {
                return true;
            }
            current = element.parent();
        }
        false
    }

    fn deliver(&self, entries: &[IntersectionEntry]) {
        if self.is_disconnected() {
            return;
        }
        let batch: Vec<IntersectionEntry> = entries
            .iter()
            .filter(|entry| self.covers(&entry.target))
            .cloned()
            .collect();
        if !batch.is_empty() {
            (self.callback)(batch);
        }
    }
}

impl IntersectionObserver for FakeObserver {
    fn observe(&self, target: &ElementRef) {
        *self.disconnected.lock() = false;
        let mut targets = self.targets.lock();
        if !targets.iter().any(|observed| Arc::ptr_eq(observed, target)) {
            targets.push(Arc::clone(target));
        }
    }

    fn unobserve(&self, target: &ElementRef) {
        self.targets
            .lock()
            .retain(|observed| !Arc::ptr_eq(observed, target));
    }

    fn disconnect(&self) {
        *self.disconnected.lock() = true;
        self.targets.lock().clear();
    }
}

/// Viewport whose observers fire only when a test emits a batch.
#[derive(Debug, Default)]
pub struct FakeViewport {
    observers: Mutex<Vec<Arc<FakeObserver>>>,
}

impl FakeViewport {
    /// Observers with `margin` that have not been disconnected, in creation
    /// order.
    pub fn live_observers(&self, margin: RootMargin) -> Vec<Arc<FakeObserver>> {
        self.observers
            .lock()
            .iter()
            .filter(|observer| {
                observer.options.root_margin == margin && !observer.is_disconnected()
            })
            .cloned()
            .collect()
    }

    pub fn created_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Deliver `entries` to every live observer with `margin`. Each observer
    /// only sees entries for targets it observes (or nodes nested in them).
    pub fn emit(&self, margin: RootMargin, entries: Vec<IntersectionEntry>) {
        // Callbacks may create or disconnect observers; deliver unlocked.
        for observer in self.live_observers(margin) {
            observer.deliver(&entries);
        }
    }

    pub fn show(&self, margin: RootMargin, target: &ElementRef, ratio: f32) {
        self.emit(
            margin,
            vec![IntersectionEntry::new(Arc::clone(target), true, ratio)],
        );
    }

    pub fn hide(&self, margin: RootMargin, target: &ElementRef) {
        self.emit(
            margin,
            vec![IntersectionEntry::new(Arc::clone(target), false, 0.0)],
        );
    }
}

impl Viewport for FakeViewport {
    fn create_observer(
        &self,
        options: ObserverOptions,
        callback: IntersectionCallback,
    ) -> SharedObserver {
        let observer = Arc::new(FakeObserver {
            options,
            callback,
            targets: Mutex::new(Vec::new()),
            disconnected: Mutex::new(false),
        });
        self.observers.lock().push(Arc::clone(&observer));
        observer
    }
}
