//! Compiled defaults for every tunable the schedulers read.
//!
//! `FeedConfig` starts from these values; files, environment variables and
//! runtime settings override them.

/// Pagination and materialization
pub mod feed {
    /// Items requested per page
    pub const PAGE_SIZE: usize = 20;

    /// Margin (px) around the viewport at which a card's player is built
    pub const PREROLL_MARGIN_PX: i32 = 400;

    /// Margin (px) at which the tail sentinel requests the next page
    pub const PAGINATION_MARGIN_PX: i32 = 800;

    /// Distance (px) past which a materialized player is released again.
    /// Zero disables distance-based unloading.
    pub const UNLOAD_DISTANCE_PX: u32 = 2400;
}

/// Playback admission
pub mod playback {
    use std::time::Duration;

    /// Hard ceiling on simultaneously admitted players
    pub const MAX_CONCURRENT_VIDEOS: usize = 3;

    /// Minimum visible ratio for a clip to count as in view
    pub const AUTO_PLAY_THRESHOLD: f32 = 0.5;

    pub const AUTO_PLAY: bool = true;

    /// Delay before the single retry of a rejected `play()`
    pub const PLAY_RETRY_DELAY: Duration = Duration::from_millis(250);

    /// Total `play()` attempts per admission (first try plus one retry)
    pub const PLAY_ATTEMPTS: u32 = 2;
}

/// Preview prefetch
pub mod prefetch {
    /// Previews started per prefetch pass
    pub const PREFETCH_COUNT: usize = 8;

    /// Resolved preview URLs kept before the oldest is dropped
    pub const CACHE_CAPACITY: usize = 128;

    /// Query parameter carrying the cache-bust token
    pub const CACHE_BUST_PARAM: &str = "t";
}

/// Configuration file and environment lookup
pub mod env {
    /// Explicit config file path
    pub const CONFIG_PATH: &str = "REELFEED_CONFIG";
    pub const PAGE_SIZE: &str = "REELFEED_PAGE_SIZE";
    pub const MAX_CONCURRENT_VIDEOS: &str = "REELFEED_MAX_CONCURRENT_VIDEOS";
    pub const AUTO_PLAY: &str = "REELFEED_AUTO_PLAY";
    pub const AUTO_PLAY_THRESHOLD: &str = "REELFEED_AUTO_PLAY_THRESHOLD";
    pub const POSTER_BASE_URL: &str = "REELFEED_POSTER_BASE_URL";

    /// Directory under the platform config dir
    pub const APP_DIR: &str = "reelfeed";
    pub const CONFIG_FILE: &str = "config.json";
}
