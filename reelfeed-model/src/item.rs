use crate::error::{ModelError, Result};
use crate::ids::ItemId;

/// One schedulable feed entry: a marker referencing a clip and an optional
/// poster image. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedItem {
    pub id: ItemId,
    /// Items without a media URL are never materialized.
    pub media_url: Option<String>,
    /// Key (path) used to derive the preview image URL.
    pub poster_key: Option<String>,
    /// Clip start inside the source media, in seconds.
    pub start_offset: Option<f64>,
    /// Clip end inside the source media, in seconds.
    pub end_offset: Option<f64>,
    pub title: Option<String>,
}

impl FeedItem {
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            media_url: None,
            poster_key: None,
            start_offset: None,
            end_offset: None,
            title: None,
        }
    }

    pub fn with_media_url(mut self, url: impl Into<String>) -> Self {
        self.media_url = Some(url.into());
        self
    }

    pub fn with_poster_key(mut self, key: impl Into<String>) -> Self {
        self.poster_key = Some(key.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the clip window. `end` must be after `start` when both are given.
    pub fn with_offsets(
        mut self,
        start: Option<f64>,
        end: Option<f64>,
    ) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end)
            && s >= e
        {
            return Err(ModelError::InvalidOffsets { start: s, end: e });
        }
        self.start_offset = start;
        self.end_offset = end;
        Ok(self)
    }

    pub fn is_playable(&self) -> bool {
        self.media_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}
