use async_trait::async_trait;
use reelfeed_model::{FeedFilters, FeedItem};

use crate::error::FetchError;

/// Paginated source of feed items.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch page `page` (1-based) of at most `page_size` items. An empty or
    /// short result signals the end of the data.
    async fn fetch_page(
        &self,
        filters: &FeedFilters,
        page_size: usize,
        page: usize,
    ) -> Result<Vec<FeedItem>, FetchError>;
}
