mod support;

use reelfeed_core::infra::config::FeedConfig;
use reelfeed_core::infra::constants::playback;
use reelfeed_core::{ConfigError, FeedError};
use support::FeedHarness;

#[test]
fn config_file_drives_scheduler_settings() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("reelfeed").join("config.json");
    std::fs::create_dir_all(path.parent().expect("has parent"))?;
    std::fs::write(
        &path,
        r#"{
            "max_concurrent_videos": 1,
            "auto_play_threshold": 0.75,
            "poster_base_url": "https://cdn.example.org/previews/"
        }"#,
    )?;

    let config = FeedConfig::load_from_path(&path)?;
    assert_eq!(config.play_retry_delay(), playback::PLAY_RETRY_DELAY);

    let h = FeedHarness::new(config)?;
    let options = h.feed.visibility().options();
    assert_eq!(options.max_concurrent, 1);
    assert_eq!(options.threshold, 0.75);
    assert!(options.auto_play);
    Ok(())
}

#[test]
fn invalid_config_is_rejected_by_scheduler() {
    let config = FeedConfig {
        page_size: 0,
        ..FeedConfig::default()
    };
    let err = FeedHarness::new(config).err().expect("page size 0 rejected");
    let err = err
        .downcast_ref::<FeedError>()
        .expect("feed error in chain");
    assert!(matches!(
        err,
        FeedError::Config(ConfigError::Invalid {
            key: "page_size",
            ..
        })
    ));
}
