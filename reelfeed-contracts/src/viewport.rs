use std::sync::Arc;

use reelfeed_model::{ElementRef, IntersectionEntry, ObserverOptions};

/// Receives one batch of changed entries. Batches are delivered one at a
/// time; entries within a batch are in platform order.
pub type IntersectionCallback = Arc<dyn Fn(Vec<IntersectionEntry>) + Send + Sync>;

/// Handle to one platform intersection observer.
pub trait IntersectionObserver: Send + Sync {
    fn observe(&self, target: &ElementRef);

    fn unobserve(&self, target: &ElementRef);

    /// Stop delivering callbacks for every target. Idempotent.
    fn disconnect(&self);
}

pub type SharedObserver = Arc<dyn IntersectionObserver>;

/// Viewport intersection primitive.
pub trait Viewport: Send + Sync {
    fn create_observer(
        &self,
        options: ObserverOptions,
        callback: IntersectionCallback,
    ) -> SharedObserver;
}
