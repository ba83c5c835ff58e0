use std::collections::{HashSet, VecDeque};

use reelfeed_model::ItemId;

/// Ids admitted to play, in admission order.
///
/// Eviction is oldest-admitted first, so order is tracked explicitly rather
/// than relying on a map's iteration order.
#[derive(Debug, Default)]
pub(crate) struct ActiveSet {
    order: VecDeque<ItemId>,
    members: HashSet<ItemId>,
}

impl ActiveSet {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.members.contains(id)
    }

    /// Append `id` as the newest admission. Returns false if already present.
    pub fn push(&mut self, id: ItemId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    pub fn remove(&mut self, id: &ItemId) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        if let Some(pos) = self.order.iter().position(|entry| entry == id) {
            self.order.remove(pos);
        }
        true
    }

    pub fn pop_oldest(&mut self) -> Option<ItemId> {
        let oldest = self.order.pop_front()?;
        self.members.remove(&oldest);
        Some(oldest)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_admission_order() {
        let mut set = ActiveSet::default();
        assert!(set.push("a".into()));
        assert!(set.push("b".into()));
        assert!(!set.push("a".into()));
        assert!(set.push("c".into()));
        assert!(set.remove(&"b".into()));

        assert_eq!(set.pop_oldest(), Some("a".into()));
        assert_eq!(set.pop_oldest(), Some("c".into()));
        assert_eq!(set.pop_oldest(), None);
        assert_eq!(set.len(), 0);
    }
}
