use reelfeed_model::{ElementRef, FeedItem};

/// Rendering side of the feed. Card markup lives behind this trait; the
/// scheduler only needs element handles to observe.
pub trait FeedSurface: Send + Sync {
    /// Render a card for `item` at the end of the list and return its
    /// container, which must carry the item's marker.
    fn append_container(&self, item: &FeedItem) -> ElementRef;

    fn remove_container(&self, container: &ElementRef);

    /// The pagination sentinel trailing the list.
    fn sentinel(&self) -> ElementRef;

    /// Re-append the sentinel so it follows the last card.
    fn move_sentinel_to_end(&self);

    fn show_error(&self, message: &str);

    fn clear_error(&self);
}
