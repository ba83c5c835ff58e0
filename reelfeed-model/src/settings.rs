/// Partial update of the user-adjustable scheduling settings. `None` fields
/// keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SettingsUpdate {
    pub max_concurrent_videos: Option<usize>,
    /// Minimum visible ratio (0.0..=1.0) for a clip to auto-play.
    pub auto_play_threshold: Option<f32>,
    /// Distance in pixels beyond which a materialized player is released.
    /// `Some(0)` disables distance-based unloading.
    pub unload_distance: Option<u32>,
    pub auto_play: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.max_concurrent_videos.is_none()
            && self.auto_play_threshold.is_none()
            && self.unload_distance.is_none()
            && self.auto_play.is_none()
    }
}
