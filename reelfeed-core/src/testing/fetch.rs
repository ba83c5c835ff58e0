use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use reelfeed_contracts::error::FetchError;
use reelfeed_contracts::fetch::PageFetcher;
use reelfeed_model::{FeedFilters, FeedItem};
use tokio::sync::oneshot;

/// `count` playable items with ids `m-<start>..`, each with a media url and
/// a relative poster key.
pub fn sample_items(start: usize, count: usize) -> Vec<FeedItem> {
    (start..start + count)
        .map(|n| {
            FeedItem::new(format!("m-{n}"))
                .with_media_url(format!("/media/m-{n}.mp4"))
                .with_poster_key(format!("m-{n}.webp"))
                .with_title(format!("Marker {n}"))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub filters: FeedFilters,
    pub page_size: usize,
    pub page: usize,
}

#[derive(Default)]
struct FetcherState {
    responses: VecDeque<Result<Vec<FeedItem>, FetchError>>,
    calls: Vec<FetchCall>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Page fetcher answering from a queue. An exhausted queue answers with an
/// empty page.
#[derive(Default)]
pub struct ScriptedFetcher {
    state: Mutex<FetcherState>,
}

impl std::fmt::Debug for ScriptedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ScriptedFetcher")
            .field("queued", &state.responses.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl ScriptedFetcher {
    pub fn push_page(&self, items: Vec<FeedItem>) {
        self.state.lock().responses.push_back(Ok(items));
    }

    pub fn push_error(&self, error: FetchError) {
        self.state.lock().responses.push_back(Err(error));
    }

    /// Keep the next fetch pending until the returned sender fires.
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.state.lock().gate = Some(gate);
        release
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.state.lock().calls.clone()
    }

    /// Requested page numbers, in call order.
    pub fn pages(&self) -> Vec<usize> {
        self.state.lock().calls.iter().map(|call| call.page).collect()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        filters: &FeedFilters,
        page_size: usize,
        page: usize,
    ) -> Result<Vec<FeedItem>, FetchError> {
        let gate = {
            let mut state = self.state.lock();
            state.calls.push(FetchCall {
                filters: filters.clone(),
                page_size,
                page,
            });
            state.gate.take()
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.state
            .lock()
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
