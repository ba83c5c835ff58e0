//! Trait surfaces that describe the collaborators the reelfeed schedulers
//! consume: the page fetcher, the media factory, the viewport intersection
//! primitive, the preview image loader and the rendering surface.

pub mod error;
pub mod fetch;
pub mod image;
pub mod media;
pub mod surface;
pub mod viewport;

/// Frequently used trait combinators for scheduler and orchestration crates.
pub mod prelude {
    pub use super::error::{
        FetchError, ImageLoadError, MediaError, PlaybackError,
    };
    pub use super::fetch::PageFetcher;
    pub use super::image::ImageLoader;
    pub use super::media::{MediaFactory, MediaHandle, SharedMediaHandle};
    pub use super::surface::FeedSurface;
    pub use super::viewport::{
        IntersectionCallback, IntersectionObserver, SharedObserver, Viewport,
    };
}
