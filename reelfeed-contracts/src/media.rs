use std::sync::Arc;

use async_trait::async_trait;
use reelfeed_model::PlaybackState;

use crate::error::{MediaError, PlaybackError};

/// Capability wrapper around one playable, decoded media resource.
///
/// Implementations own exactly one underlying resource. `destroy` releases it;
/// every method must tolerate being called after `destroy`.
#[async_trait]
pub trait MediaHandle: Send + Sync {
    /// Start or resume playback. Resolves once the platform accepted (or
    /// rejected) the request.
    async fn play(&self) -> Result<(), PlaybackError>;

    fn pause(&self);

    fn state(&self) -> PlaybackState;

    fn destroy(&self);
}

pub type SharedMediaHandle = Arc<dyn MediaHandle>;

/// Builds media handles. Construction must not block on the network:
/// readiness is observed later through the handle itself.
pub trait MediaFactory: Send + Sync {
    fn create(
        &self,
        url: &str,
        start: Option<f64>,
        end: Option<f64>,
    ) -> Result<SharedMediaHandle, MediaError>;
}
