//! Feed composition: pagination, lazy materialization and tail-triggered
//! loading.

mod pagination;
mod scheduler;

use std::fmt;
use std::sync::Arc;

use reelfeed_contracts::fetch::PageFetcher;
use reelfeed_contracts::media::MediaFactory;
use reelfeed_contracts::surface::FeedSurface;
use reelfeed_contracts::viewport::Viewport;

pub use pagination::PaginationState;
pub use scheduler::FeedScheduler;

/// External collaborators the feed drives.
#[derive(Clone)]
pub struct FeedCollaborators {
    pub fetcher: Arc<dyn PageFetcher>,
    pub factory: Arc<dyn MediaFactory>,
    pub viewport: Arc<dyn Viewport>,
    pub surface: Arc<dyn FeedSurface>,
}

impl fmt::Debug for FeedCollaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedCollaborators").finish_non_exhaustive()
    }
}

/// Result of a `load` or `load_more` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page arrived; this many new items were appended.
    Appended(usize),
    Skipped(SkipReason),
    /// A later page failed and was absorbed. First-page failures are
    /// returned as errors instead.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another fetch for this feed is already running.
    InFlight,
    /// No further pages for the current filters.
    Exhausted,
    /// A fresh load, clear or shutdown made the result irrelevant.
    Superseded,
}
