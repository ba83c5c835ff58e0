use reelfeed_contracts::error::FetchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    /// Only the first page of a fresh `load` is reported this way; later
    /// page failures are absorbed and retried on the next tail intersection.
    #[error("Feed failed to load: {0}")]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
