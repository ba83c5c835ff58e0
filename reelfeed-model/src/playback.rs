/// Point-in-time view of a media handle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Seconds from the start of the source media.
    pub current_time: f64,
    /// Seconds; `None` until metadata has loaded.
    pub duration: Option<f64>,
    /// Enough data is buffered to start playback without stalling.
    pub ready: bool,
}
