use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use reelfeed_contracts::error::ImageLoadError;
use reelfeed_contracts::image::ImageLoader;
use tokio::sync::oneshot;

type Completion = oneshot::Sender<Result<(), ImageLoadError>>;

#[derive(Default)]
struct LoaderState {
    requested: Vec<String>,
    pending: HashMap<String, Completion>,
}

/// Image loader whose loads stay pending until [`complete`] is called, or
/// resolve at once when built with [`immediate`].
///
/// [`complete`]: DeferredImageLoader::complete
/// [`immediate`]: DeferredImageLoader::immediate
#[derive(Default)]
pub struct DeferredImageLoader {
    immediate: bool,
    state: Mutex<LoaderState>,
}

impl std::fmt::Debug for DeferredImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DeferredImageLoader")
            .field("immediate", &self.immediate)
            .field("requested", &state.requested.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl DeferredImageLoader {
    pub fn immediate() -> Self {
        Self {
            immediate: true,
            ..Self::default()
        }
    }

    /// Every url a load was started for, in order.
    pub fn requested(&self) -> Vec<String> {
        self.state.lock().requested.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Resolve the pending load for `url`. Returns false when nothing is
    /// listening any more, e.g. because the load was aborted.
    pub fn complete(&self, url: &str, result: Result<(), ImageLoadError>) -> bool {
        let completion = self.state.lock().pending.remove(url);
        completion.is_some_and(|completion| completion.send(result).is_ok())
    }
}

#[async_trait]
impl ImageLoader for DeferredImageLoader {
    async fn load(&self, url: &str) -> Result<(), ImageLoadError> {
        let completion = {
            let mut state = self.state.lock();
            state.requested.push(url.to_string());
            if self.immediate {
                return Ok(());
            }
            let (completion, result) = oneshot::channel();
            state.pending.insert(url.to_string(), completion);
            result
        };
        completion.await.unwrap_or(Err(ImageLoadError::Aborted))
    }
}
