//! Scheduler-focused snapshot of the types surface.
//! Prefer importing from this module instead of individual tree nodes.

pub use super::element::{Element, ElementRef};
pub use super::filter_types::{FeedFilters, SortDirection, SortField};
pub use super::ids::{ElementId, ItemId};
pub use super::intersection::{IntersectionEntry, ObserverOptions, RootMargin};
pub use super::item::FeedItem;
pub use super::playback::PlaybackState;
pub use super::settings::SettingsUpdate;
