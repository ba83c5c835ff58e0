//! Runtime configuration for user-adjustable settings
//!
//! `RuntimeConfig` holds optional overrides on top of a loaded
//! [`FeedConfig`]. Accessor methods fall back to the config when unset.

use std::time::Duration;

use reelfeed_model::{RootMargin, SettingsUpdate};

use crate::error::ConfigError;
use crate::infra::config::{
    FeedConfig, validate_max_concurrent, validate_threshold,
    validate_unload_distance,
};

/// Which settings actually changed after applying an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsDelta {
    pub max_concurrent_videos: bool,
    pub auto_play_threshold: bool,
    pub unload_distance: bool,
    pub auto_play: bool,
}

impl SettingsDelta {
    pub fn any(&self) -> bool {
        self.max_concurrent_videos
            || self.auto_play_threshold
            || self.unload_distance
            || self.auto_play
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    base: FeedConfig,

    /// Tracks if any setting was modified since last clear
    pub dirty: bool,

    pub max_concurrent_videos: Option<usize>,
    pub auto_play_threshold: Option<f32>,
    pub unload_distance: Option<u32>,
    pub auto_play: Option<bool>,
}

impl RuntimeConfig {
    pub fn new(base: FeedConfig) -> Self {
        Self {
            base,
            dirty: false,
            max_concurrent_videos: None,
            auto_play_threshold: None,
            unload_distance: None,
            auto_play: None,
        }
    }

    pub fn base(&self) -> &FeedConfig {
        &self.base
    }

    /// Clear dirty flag and return whether it was dirty
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Validate and apply `update`. Nothing is applied when any field is
    /// invalid.
    pub fn apply(
        &mut self,
        update: SettingsUpdate,
    ) -> Result<SettingsDelta, ConfigError> {
        if let Some(max) = update.max_concurrent_videos {
            validate_max_concurrent(max)?;
        }
        if let Some(threshold) = update.auto_play_threshold {
            validate_threshold(threshold)?;
        }
        if let Some(distance) = update.unload_distance {
            validate_unload_distance(distance, self.preroll_margin().top)?;
        }

        let mut delta = SettingsDelta::default();
        if let Some(max) = update.max_concurrent_videos
            && max != self.max_concurrent_videos()
        {
            self.max_concurrent_videos = Some(max);
            delta.max_concurrent_videos = true;
        }
        if let Some(threshold) = update.auto_play_threshold
            && threshold != self.auto_play_threshold()
        {
            self.auto_play_threshold = Some(threshold);
            delta.auto_play_threshold = true;
        }
        if let Some(distance) = update.unload_distance
            && distance != self.unload_distance()
        {
            self.unload_distance = Some(distance);
            delta.unload_distance = true;
        }
        if let Some(auto_play) = update.auto_play
            && auto_play != self.auto_play()
        {
            self.auto_play = Some(auto_play);
            delta.auto_play = true;
        }

        if delta.any() {
            self.dirty = true;
        }
        Ok(delta)
    }

    // ========== PLAYBACK ==========

    pub fn max_concurrent_videos(&self) -> usize {
        self.max_concurrent_videos
            .unwrap_or(self.base.max_concurrent_videos)
    }

    pub fn auto_play_threshold(&self) -> f32 {
        self.auto_play_threshold
            .unwrap_or(self.base.auto_play_threshold)
    }

    pub fn auto_play(&self) -> bool {
        self.auto_play.unwrap_or(self.base.auto_play)
    }

    pub fn play_retry_delay(&self) -> Duration {
        self.base.play_retry_delay()
    }

    // ========== FEED ==========

    pub fn page_size(&self) -> usize {
        self.base.page_size
    }

    /// Zero means distance-based unloading is off.
    pub fn unload_distance(&self) -> u32 {
        self.unload_distance.unwrap_or(self.base.unload_distance_px)
    }

    pub fn unload_margin(&self) -> Option<RootMargin> {
        match self.unload_distance() {
            0 => None,
            px => Some(RootMargin::vertical(
                i32::try_from(px).unwrap_or(i32::MAX),
            )),
        }
    }

    pub fn preroll_margin(&self) -> RootMargin {
        RootMargin::vertical(self.base.preroll_margin_px)
    }

    pub fn pagination_margin(&self) -> RootMargin {
        RootMargin::vertical(self.base.pagination_margin_px)
    }

    // ========== PREFETCH ==========

    pub fn prefetch_count(&self) -> usize {
        self.base.prefetch_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_fall_back_to_base() {
        let mut rc = RuntimeConfig::new(FeedConfig::default());
        assert_eq!(rc.max_concurrent_videos(), rc.base().max_concurrent_videos);

        let delta = rc
            .apply(SettingsUpdate {
                max_concurrent_videos: Some(1),
                auto_play_threshold: Some(rc.auto_play_threshold()),
                ..SettingsUpdate::default()
            })
            .expect("valid update");
        assert!(delta.max_concurrent_videos);
        assert!(!delta.auto_play_threshold, "unchanged value is not a delta");
        assert_eq!(rc.max_concurrent_videos(), 1);
        assert!(rc.take_dirty());
        assert!(!rc.take_dirty());
    }

    #[test]
    fn invalid_update_applies_nothing() {
        let mut rc = RuntimeConfig::new(FeedConfig::default());
        let err = rc.apply(SettingsUpdate {
            max_concurrent_videos: Some(5),
            auto_play_threshold: Some(-0.1),
            ..SettingsUpdate::default()
        });
        assert!(err.is_err());
        assert_eq!(rc.max_concurrent_videos(), rc.base().max_concurrent_videos);
        assert!(!rc.dirty);
    }

    #[test]
    fn zero_unload_distance_disables_margin() {
        let mut rc = RuntimeConfig::new(FeedConfig::default());
        assert!(rc.unload_margin().is_some());
        rc.apply(SettingsUpdate {
            unload_distance: Some(0),
            ..SettingsUpdate::default()
        })
        .expect("disable unload");
        assert_eq!(rc.unload_margin(), None);
    }
}
