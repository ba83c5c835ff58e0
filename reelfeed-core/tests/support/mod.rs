//! Shared harness for reelfeed-core integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reelfeed_contracts::surface::FeedSurface;
use reelfeed_core::feed::{FeedCollaborators, FeedScheduler};
use reelfeed_core::infra::config::FeedConfig;
use reelfeed_core::infra::constants::feed::{
    PAGINATION_MARGIN_PX, PREROLL_MARGIN_PX, UNLOAD_DISTANCE_PX,
};
use reelfeed_core::prefetch::PrefetchCache;
use reelfeed_core::testing::{
    DeferredImageLoader, FakeMediaFactory, FakeMediaHandle, FakeViewport,
    RecordingSurface, ScriptedFetcher, init_logging, sample_items,
};
use reelfeed_model::{ElementRef, FeedFilters, ItemId, RootMargin};

pub const POSTER_BASE: &str = "https://cdn.example.org/previews/";

/// Root margin of the playback observer.
pub const PLAYBACK: RootMargin = RootMargin::ZERO;
pub const PREROLL: RootMargin = RootMargin::vertical(PREROLL_MARGIN_PX);
pub const TAIL: RootMargin = RootMargin::vertical(PAGINATION_MARGIN_PX);
pub const UNLOAD: RootMargin = RootMargin::vertical(UNLOAD_DISTANCE_PX as i32);

pub struct FeedHarness {
    pub fetcher: Arc<ScriptedFetcher>,
    pub factory: Arc<FakeMediaFactory>,
    pub viewport: Arc<FakeViewport>,
    pub surface: Arc<RecordingSurface>,
    pub images: Arc<DeferredImageLoader>,
    pub feed: FeedScheduler,
}

impl FeedHarness {
    pub fn new(config: FeedConfig) -> Result<Self> {
        init_logging();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let factory = Arc::new(FakeMediaFactory::default());
        let viewport = Arc::new(FakeViewport::default());
        let surface = Arc::new(RecordingSurface::default());
        let images = Arc::new(DeferredImageLoader::default());

        let prefetch = PrefetchCache::from_config(images.clone(), &config)
            .context("prefetch cache from config")?;
        let feed = FeedScheduler::new(
            config,
            FeedCollaborators {
                fetcher: fetcher.clone(),
                factory: factory.clone(),
                viewport: viewport.clone(),
                surface: surface.clone(),
            },
            prefetch,
        )
        .context("feed scheduler from config")?;

        Ok(Self {
            fetcher,
            factory,
            viewport,
            surface,
            images,
            feed,
        })
    }

    /// Harness whose first page of `items` playable markers is already
    /// loaded.
    pub async fn loaded(config: FeedConfig, items: usize) -> Result<Self> {
        let harness = Self::new(config)?;
        harness.fetcher.push_page(sample_items(0, items));
        harness
            .feed
            .load(FeedFilters::default())
            .await
            .context("first page")?;
        Ok(harness)
    }

    pub fn container(&self, id: &str) -> ElementRef {
        self.surface
            .container(&ItemId::from(id))
            .unwrap_or_else(|| panic!("{id} is not rendered"))
    }

    pub fn sentinel(&self) -> ElementRef {
        self.surface.sentinel()
    }

    /// Bring `id` into the pre-roll band and return the handle built for it.
    pub fn materialize(&self, id: &str) -> Arc<FakeMediaHandle> {
        self.viewport.show(PREROLL, &self.container(id), 0.0);
        self.factory
            .handle_for(&format!("/media/{id}.mp4"))
            .unwrap_or_else(|| panic!("no handle built for {id}"))
    }

    pub fn playing(&self, handles: &[Arc<FakeMediaHandle>]) -> usize {
        handles.iter().filter(|handle| handle.is_playing()).count()
    }
}

pub fn config(page_size: usize) -> FeedConfig {
    FeedConfig {
        page_size,
        poster_base_url: Some(POSTER_BASE.into()),
        ..FeedConfig::default()
    }
}
