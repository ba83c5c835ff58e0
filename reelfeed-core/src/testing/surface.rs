use std::sync::Arc;

use parking_lot::Mutex;
use reelfeed_contracts::surface::FeedSurface;
use reelfeed_model::{Element, ElementRef, FeedItem, ItemId};

#[derive(Default)]
struct SurfaceState {
    rendered: Vec<(ItemId, ElementRef)>,
    removed: Vec<ItemId>,
    sentinel_moves: usize,
    error: Option<String>,
    errors_shown: usize,
}

/// Rendering surface that keeps containers in a list.
pub struct RecordingSurface {
    sentinel: ElementRef,
    state: Mutex<SurfaceState>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self {
            sentinel: Element::detached(),
            state: Mutex::new(SurfaceState::default()),
        }
    }
}

impl std::fmt::Debug for RecordingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RecordingSurface")
            .field("rendered", &state.rendered.len())
            .field("removed", &state.removed.len())
            .field("error", &state.error)
            .finish()
    }
}

impl RecordingSurface {
    /// Ids of the currently rendered containers, top to bottom.
    pub fn rendered_ids(&self) -> Vec<ItemId> {
        self.state
            .lock()
            .rendered
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn container(&self, id: &ItemId) -> Option<ElementRef> {
        self.state
            .lock()
            .rendered
            .iter()
            .find(|(rendered, _)| rendered == id)
            .map(|(_, container)| Arc::clone(container))
    }

    pub fn removed(&self) -> Vec<ItemId> {
        self.state.lock().removed.clone()
    }

    pub fn sentinel_moves(&self) -> usize {
        self.state.lock().sentinel_moves
    }

    /// Error currently shown, if any.
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn errors_shown(&self) -> usize {
        self.state.lock().errors_shown
    }
}

impl FeedSurface for RecordingSurface {
    fn append_container(&self, item: &FeedItem) -> ElementRef {
        let container = Element::container(item.id.clone());
        self.state
            .lock()
            .rendered
            .push((item.id.clone(), Arc::clone(&container)));
        container
    }

    fn remove_container(&self, container: &ElementRef) {
        let mut state = self.state.lock();
        if let Some(pos) = state
            .rendered
            .iter()
            .position(|(_, rendered)| Arc::ptr_eq(rendered, container))
        {
            let (id, _) = state.rendered.remove(pos);
            state.removed.push(id);
        }
    }

    fn sentinel(&self) -> ElementRef {
        Arc::clone(&self.sentinel)
    }

    fn move_sentinel_to_end(&self) {
        self.state.lock().sentinel_moves += 1;
    }

    fn show_error(&self, message: &str) {
        let mut state = self.state.lock();
        state.error = Some(message.to_string());
        state.errors_shown += 1;
    }

    fn clear_error(&self) {
        self.state.lock().error = None;
    }
}
