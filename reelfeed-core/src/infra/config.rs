use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::infra::constants::{env, feed, playback, prefetch};

/// Scheduler configuration. Missing fields in a config file fall back to
/// the compiled defaults in [`crate::infra::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: usize,
    pub max_concurrent_videos: usize,
    pub auto_play: bool,
    pub auto_play_threshold: f32,
    pub preroll_margin_px: i32,
    pub pagination_margin_px: i32,
    /// Zero disables distance-based unloading.
    pub unload_distance_px: u32,
    pub prefetch_count: usize,
    pub prefetch_capacity: usize,
    pub play_retry_delay_ms: u64,
    /// Base that relative poster keys are joined onto.
    pub poster_base_url: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: feed::PAGE_SIZE,
            max_concurrent_videos: playback::MAX_CONCURRENT_VIDEOS,
            auto_play: playback::AUTO_PLAY,
            auto_play_threshold: playback::AUTO_PLAY_THRESHOLD,
            preroll_margin_px: feed::PREROLL_MARGIN_PX,
            pagination_margin_px: feed::PAGINATION_MARGIN_PX,
            unload_distance_px: feed::UNLOAD_DISTANCE_PX,
            prefetch_count: prefetch::PREFETCH_COUNT,
            prefetch_capacity: prefetch::CACHE_CAPACITY,
            play_retry_delay_ms: playback::PLAY_RETRY_DELAY.as_millis() as u64,
            poster_base_url: None,
        }
    }
}

impl FeedConfig {
    /// Load from `$REELFEED_CONFIG`, else `<config_dir>/reelfeed/config.json`
    /// when it exists, else defaults; then apply `REELFEED_*` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: FeedConfig = serde_json::from_str(&content)?;
        log::debug!("Loaded feed config from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var(env::CONFIG_PATH) {
            return Some(PathBuf::from(explicit));
        }
        dirs::config_dir().map(|dir| dir.join(env::APP_DIR).join(env::CONFIG_FILE))
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(env::PAGE_SIZE) {
            self.page_size = parse_var(env::PAGE_SIZE, "page_size", &raw)?;
        }
        if let Some(raw) = lookup(env::MAX_CONCURRENT_VIDEOS) {
            self.max_concurrent_videos =
                parse_var(env::MAX_CONCURRENT_VIDEOS, "max_concurrent_videos", &raw)?;
        }
        if let Some(raw) = lookup(env::AUTO_PLAY) {
            self.auto_play = parse_var(env::AUTO_PLAY, "auto_play", &raw)?;
        }
        if let Some(raw) = lookup(env::AUTO_PLAY_THRESHOLD) {
            self.auto_play_threshold =
                parse_var(env::AUTO_PLAY_THRESHOLD, "auto_play_threshold", &raw)?;
        }
        if let Some(raw) = lookup(env::POSTER_BASE_URL) {
            self.poster_base_url = Some(raw);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::invalid("page_size", "must be at least 1"));
        }
        validate_max_concurrent(self.max_concurrent_videos)?;
        validate_threshold(self.auto_play_threshold)?;
        validate_unload_distance(self.unload_distance_px, self.preroll_margin_px)?;
        if self.prefetch_capacity == 0 {
            return Err(ConfigError::invalid(
                "prefetch_capacity",
                "must be at least 1",
            ));
        }
        if let Some(base) = &self.poster_base_url {
            url::Url::parse(base).map_err(|err| {
                ConfigError::invalid("poster_base_url", err.to_string())
            })?;
        }
        Ok(())
    }

    pub fn play_retry_delay(&self) -> Duration {
        Duration::from_millis(self.play_retry_delay_ms)
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &str,
    key: &'static str,
    raw: &str,
) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("{var}={raw:?} does not parse")))
}

pub(crate) fn validate_max_concurrent(value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(
            "max_concurrent_videos",
            "must be at least 1",
        ));
    }
    Ok(())
}

pub(crate) fn validate_threshold(value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(
            "auto_play_threshold",
            format!("{value} is outside 0.0..=1.0"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_unload_distance(
    distance: u32,
    preroll_margin: i32,
) -> Result<(), ConfigError> {
    // A release band inside the pre-roll band would rebuild and release the
    // same player on every scroll tick.
    if distance > 0 && i64::from(distance) <= i64::from(preroll_margin) {
        return Err(ConfigError::invalid(
            "unload_distance",
            format!("{distance}px must exceed the pre-roll margin ({preroll_margin}px)"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "page_size": 5, "auto_play": false }"#)
            .expect("write config");

        let config = FeedConfig::load_from_path(&path).expect("load config");
        assert_eq!(config.page_size, 5);
        assert!(!config.auto_play);
        assert_eq!(config.max_concurrent_videos, playback::MAX_CONCURRENT_VIDEOS);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");
        let config = FeedConfig {
            max_concurrent_videos: 1,
            poster_base_url: Some("https://cdn.example.org/previews/".into()),
            ..FeedConfig::default()
        };
        config.save_to_path(&path).expect("save");
        assert_eq!(FeedConfig::load_from_path(&path).expect("load"), config);
    }

    #[test]
    fn env_overrides_are_parsed_and_validated() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (env::MAX_CONCURRENT_VIDEOS, "2"),
            (env::AUTO_PLAY_THRESHOLD, "0.75"),
        ]);
        let mut config = FeedConfig::default();
        config
            .apply_env_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .expect("overrides");
        assert_eq!(config.max_concurrent_videos, 2);
        assert_eq!(config.auto_play_threshold, 0.75);

        let mut config = FeedConfig::default();
        let err = config
            .apply_env_overrides_from(|key| {
                (key == env::PAGE_SIZE).then(|| "many".to_string())
            })
            .expect_err("garbage page size");
        assert!(matches!(err, ConfigError::Invalid { key: "page_size", .. }));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let bad_threshold = FeedConfig {
            auto_play_threshold: 1.5,
            ..FeedConfig::default()
        };
        assert!(bad_threshold.validate().is_err());

        let zero_ceiling = FeedConfig {
            max_concurrent_videos: 0,
            ..FeedConfig::default()
        };
        assert!(zero_ceiling.validate().is_err());

        let tight_unload = FeedConfig {
            unload_distance_px: 100,
            preroll_margin_px: 400,
            ..FeedConfig::default()
        };
        assert!(tight_unload.validate().is_err());

        let unload_disabled = FeedConfig {
            unload_distance_px: 0,
            ..FeedConfig::default()
        };
        assert!(unload_disabled.validate().is_ok());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ page_size: ").expect("write config");
        assert!(matches!(
            FeedConfig::load_from_path(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
