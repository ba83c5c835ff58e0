//! Minimal element tree used to map intersection targets back to feed items.
//!
//! Observers may report a nested node (a poster image inside a card, say)
//! rather than the card itself, so every element keeps a link to its parent
//! and the item id is found by walking upwards to the nearest marked ancestor.

use std::sync::Arc;

use crate::ids::{ElementId, ItemId};

pub type ElementRef = Arc<Element>;

#[derive(Debug)]
pub struct Element {
    id: ElementId,
    item_marker: Option<ItemId>,
    parent: Option<ElementRef>,
}

impl Element {
    /// Top-level container carrying the item marker.
    pub fn container(item_id: ItemId) -> ElementRef {
        Arc::new(Self {
            id: ElementId::new(),
            item_marker: Some(item_id),
            parent: None,
        })
    }

    /// Unmarked element, e.g. the pagination sentinel.
    pub fn detached() -> ElementRef {
        Arc::new(Self {
            id: ElementId::new(),
            item_marker: None,
            parent: None,
        })
    }

    /// Nested element without a marker of its own.
    pub fn child_of(parent: &ElementRef) -> ElementRef {
        Arc::new(Self {
            id: ElementId::new(),
            item_marker: None,
            parent: Some(Arc::clone(parent)),
        })
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn item_marker(&self) -> Option<&ItemId> {
        self.item_marker.as_ref()
    }

    pub fn parent(&self) -> Option<&ElementRef> {
        self.parent.as_ref()
    }

    /// Nearest item id on the path from this element to the root.
    pub fn resolve_item_id(&self) -> Option<ItemId> {
        let mut current = Some(self);
        while let Some(element) = current {
            if let Some(marker) = &element.item_marker {
                return Some(marker.clone());
            }
            current = element.parent.as_deref();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_targets_resolve_to_their_container() {
        let card = Element::container(ItemId::from("m-1"));
        let body = Element::child_of(&card);
        let poster = Element::child_of(&body);

        assert_eq!(poster.resolve_item_id(), Some(ItemId::from("m-1")));
        assert_eq!(card.resolve_item_id(), Some(ItemId::from("m-1")));
        assert_eq!(Element::detached().resolve_item_id(), None);
    }
}
