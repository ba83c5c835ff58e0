use std::future::Future;

use tokio::runtime::Handle;

/// Tokio runtime captured when a scheduler is built.
///
/// Platform callbacks (intersection batches, UI events) may arrive on
/// threads that are not inside a runtime context, where a bare
/// `tokio::spawn` would panic. Work is spawned through the captured handle
/// instead; when none was captured the current context is tried, and the
/// work is dropped with a warning if there is none.
///
/// To build a scheduler outside a runtime, enter one first:
/// `let _guard = handle.enter();`.
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    handle: Option<Handle>,
}

impl Spawner {
    /// Capture the runtime of the calling context, if any.
    pub fn capture() -> Self {
        Self {
            handle: Handle::try_current().ok(),
        }
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub fn has_runtime(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn `future` on the captured runtime. Returns false when no runtime
    /// is reachable and the work was dropped.
    pub fn spawn<F>(&self, what: &str, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => match Handle::try_current() {
                Ok(handle) => handle,
                Err(_) => {
                    log::warn!("No tokio runtime available; dropping {what}");
                    return false;
                }
            },
        };
        handle.spawn(future);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn spawning_without_a_runtime_is_dropped_not_panicking() {
        let spawner = Spawner::capture();
        assert!(!spawner.has_runtime());
        assert!(!spawner.spawn("test task", async {}));
    }

    #[tokio::test]
    async fn captured_handle_spawns_from_foreign_threads() {
        let spawner = Spawner::capture();
        assert!(spawner.has_runtime());

        let ran = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let flag = Arc::clone(&ran);
        let spawned = std::thread::spawn(move || {
            spawner.spawn("flag", async move {
                flag.store(true, Ordering::SeqCst);
                let _ = done_tx.send(());
            })
        })
        .join()
        .expect("spawning thread");

        assert!(spawned);
        done_rx.await.expect("task ran");
        assert!(ran.load(Ordering::SeqCst));
    }
}
