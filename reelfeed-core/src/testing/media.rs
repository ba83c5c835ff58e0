use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reelfeed_contracts::error::{MediaError, PlaybackError};
use reelfeed_contracts::media::{MediaFactory, MediaHandle, SharedMediaHandle};
use reelfeed_model::PlaybackState;
use tokio::sync::oneshot;

type DestroyHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct HandleState {
    playing: bool,
    play_calls: usize,
    pause_calls: usize,
    destroyed: bool,
    failures_remaining: usize,
    gate: Option<oneshot::Receiver<()>>,
    on_destroy: Option<DestroyHook>,
}

/// Media handle that records calls. `play()` can be told to reject or to
/// wait for a release signal.
pub struct FakeMediaHandle {
    label: String,
    state: Mutex<HandleState>,
}

impl std::fmt::Debug for FakeMediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FakeMediaHandle")
            .field("label", &self.label)
            .field("playing", &state.playing)
            .field("play_calls", &state.play_calls)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

impl FakeMediaHandle {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(HandleState::default()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().pause_calls
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Reject the next `count` calls to `play()`.
    pub fn fail_next_plays(&self, count: usize) {
        self.state.lock().failures_remaining = count;
    }

    /// Keep the next `play()` pending until the returned sender fires (or is
    /// dropped).
    pub fn hold_next_play(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.state.lock().gate = Some(gate);
        release
    }

    /// Run `hook` the first time the handle is destroyed.
    pub fn on_destroy(&self, hook: impl FnOnce() + Send + 'static) {
        self.state.lock().on_destroy = Some(Box::new(hook));
    }
}

#[async_trait]
impl MediaHandle for FakeMediaHandle {
    async fn play(&self) -> Result<(), PlaybackError> {
        let gate = {
            let mut state = self.state.lock();
            state.play_calls += 1;
            state.gate.take()
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let mut state = self.state.lock();
        if state.destroyed {
            return Err(PlaybackError::Destroyed);
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(PlaybackError::AutoplayBlocked(format!(
                "{} rejected by policy",
                self.label
            )));
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        state.pause_calls += 1;
        state.playing = false;
    }

    fn state(&self) -> PlaybackState {
        let state = self.state.lock();
        PlaybackState {
            is_playing: state.playing,
            current_time: 0.0,
            duration: None,
            ready: !state.destroyed,
        }
    }

    fn destroy(&self) {
        let hook = {
            let mut state = self.state.lock();
            state.destroyed = true;
            state.playing = false;
            state.on_destroy.take()
        };
        if let Some(hook) = hook {
            hook();
        }
    }
}

#[derive(Default)]
struct FactoryState {
    created: Vec<(String, Arc<FakeMediaHandle>)>,
    failure: Option<MediaError>,
}

/// Builds [`FakeMediaHandle`]s and keeps them for inspection.
#[derive(Default)]
pub struct FakeMediaFactory {
    state: Mutex<FactoryState>,
}

impl std::fmt::Debug for FakeMediaFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeMediaFactory")
            .field("created", &self.state.lock().created.len())
            .finish()
    }
}

impl FakeMediaFactory {
    pub fn created_count(&self) -> usize {
        self.state.lock().created.len()
    }

    /// Urls handles were built for, in order.
    pub fn created_urls(&self) -> Vec<String> {
        self.state
            .lock()
            .created
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Most recent handle built for `url`.
    pub fn handle_for(&self, url: &str) -> Option<Arc<FakeMediaHandle>> {
        self.state
            .lock()
            .created
            .iter()
            .rev()
            .find(|(created, _)| created == url)
            .map(|(_, handle)| Arc::clone(handle))
    }

    /// Fail every `create` call with `error` until cleared.
    pub fn fail_with(&self, error: Option<MediaError>) {
        self.state.lock().failure = error;
    }
}

impl MediaFactory for FakeMediaFactory {
    fn create(
        &self,
        url: &str,
        _start: Option<f64>,
        _end: Option<f64>,
    ) -> Result<SharedMediaHandle, MediaError> {
        let mut state = self.state.lock();
        if let Some(error) = state.failure.clone() {
            return Err(error);
        }
        let handle = Arc::new(FakeMediaHandle::new(url));
        state.created.push((url.to_string(), Arc::clone(&handle)));
        Ok(handle)
    }
}
