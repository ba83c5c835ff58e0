//! # reelfeed core
//!
//! Scheduling core for a feed of short video clips ("markers") that plays
//! the clip in view, pauses everything else, paginates as the user scrolls
//! and warms preview images ahead of need.
//!
//! ## Architecture
//!
//! - [`visibility`]: [`VisibilityScheduler`] admits and evicts playback from
//!   viewport intersection batches under a hard concurrency ceiling.
//! - [`feed`]: [`FeedScheduler`] owns the item list and pagination cursor,
//!   materializes media handles lazily and wires them into the visibility
//!   scheduler.
//! - [`prefetch`]: [`PrefetchCache`] warms a bounded set of preview URLs and
//!   cancels work that became irrelevant.
//! - [`infra`]: configuration defaults, file/env loading and runtime
//!   overrides.
//!
//! Every collaborator (network, media, viewport, rendering) is consumed
//! through the traits in `reelfeed_contracts`; nothing here touches a
//! platform API directly.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reelfeed_core::feed::{FeedCollaborators, FeedScheduler};
//! use reelfeed_core::infra::config::FeedConfig;
//! use reelfeed_core::prefetch::PrefetchCache;
//! use reelfeed_model::FeedFilters;
//!
//! async fn run(collaborators: FeedCollaborators, images: Arc<dyn reelfeed_contracts::image::ImageLoader>)
//!     -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FeedConfig::load()?;
//!     let prefetch = PrefetchCache::from_config(images, &config)?;
//!     let feed = FeedScheduler::new(config, collaborators, prefetch)?;
//!     feed.load(FeedFilters::default()).await?;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]

/// Error types shared by the schedulers
pub mod error;

/// Composition root: pagination and lazy materialization
pub mod feed;

/// Constants, configuration loading and runtime overrides
pub mod infra;

/// Bounded preview prefetch cache with cancellation
pub mod prefetch;

/// Viewport-driven playback admission and eviction
pub mod visibility;

/// In-memory collaborators for tests
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{ConfigError, FeedError, Result};
pub use feed::{
    FeedCollaborators, FeedScheduler, LoadOutcome, PaginationState, SkipReason,
};
pub use prefetch::PrefetchCache;
pub use visibility::{VisibilityOptions, VisibilityScheduler};
