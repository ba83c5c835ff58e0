//! Core data model definitions shared across reelfeed crates.
#![allow(missing_docs)]

pub mod element;
pub mod error;
pub mod filter_types;
pub mod ids;
pub mod intersection;
pub mod item;
pub mod playback;
pub mod prelude;
pub mod settings;

// Intentionally curated re-exports for downstream consumers.
pub use element::{Element, ElementRef};
pub use error::{ModelError, Result as ModelResult};
pub use filter_types::{FeedFilters, SortDirection, SortField};
pub use ids::{ElementId, ItemId, SYNTHETIC_ID_PREFIXES};
pub use intersection::{IntersectionEntry, ObserverOptions, RootMargin};
pub use item::FeedItem;
pub use playback::PlaybackState;
pub use settings::SettingsUpdate;
