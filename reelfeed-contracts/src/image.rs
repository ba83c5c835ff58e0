use async_trait::async_trait;

use crate::error::ImageLoadError;

/// Load-and-discard image fetch used to warm the platform's image cache.
///
/// Dropping the returned future aborts the request.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<(), ImageLoadError>;
}
