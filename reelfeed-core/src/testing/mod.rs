//! In-memory collaborators for exercising the schedulers without a platform
//!
//! Compiled for this crate's tests and, behind the `testing` feature, for
//! downstream harnesses.
//!
//! - [`FakeViewport`]: records observers and lets a test emit intersection
//!   batches by root margin.
//! - [`FakeMediaHandle`] / [`FakeMediaFactory`]: playback with scriptable
//!   rejections and held `play()` calls.
//! - [`ScriptedFetcher`]: queued pages or errors, optionally held open.
//! - [`DeferredImageLoader`]: image loads completed by hand.
//! - [`RecordingSurface`]: records rendered containers and errors.
//!
//! Everything runs on the test's tokio runtime; call [`settle`] to let
//! spawned tasks catch up.

mod fetch;
mod image;
mod media;
mod surface;
mod viewport;

pub use fetch::{FetchCall, ScriptedFetcher, sample_items};
pub use image::DeferredImageLoader;
pub use media::{FakeMediaFactory, FakeMediaHandle};
pub use surface::RecordingSurface;
pub use viewport::{FakeObserver, FakeViewport};

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .parse_default_env()
        .is_test(true)
        .try_init();
}

/// Yield enough times for spawned tasks woken by the last step to run to
/// their next await point.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
