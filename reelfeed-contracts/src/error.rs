use thiserror::Error;

/// A page request failed. The scheduler decides whether this is surfaced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// `play()` was rejected by the platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("autoplay blocked: {0}")]
    AutoplayBlocked(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("media handle destroyed")]
    Destroyed,
}

/// The media factory could not produce a handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("invalid media url: {0}")]
    InvalidUrl(String),

    #[error("unsupported media: {0}")]
    Unsupported(String),
}

/// A preview image failed to load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageLoadError {
    #[error("image load failed: {0}")]
    Failed(String),

    #[error("image load aborted")]
    Aborted,
}
