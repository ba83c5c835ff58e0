//! Pagination cursor and state machine.
//!
//! ```text
//! Idle ──load──▶ Loading ──▶ Loaded | Empty
//! Loaded ──load_more──▶ LoadingMore ──▶ Loaded | Exhausted
//! ```
//!
//! A failed `Loading` falls back to `Idle`, a failed `LoadingMore` to
//! `Loaded`. `Exhausted` and `Empty` only leave through a fresh load.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Empty,
    LoadingMore,
    Exhausted,
}

impl PaginationState {
    pub fn is_loading(&self) -> bool {
        matches!(self, PaginationState::Loading | PaginationState::LoadingMore)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Pagination {
    state: PaginationState,
    /// Last successfully fetched page, 1-based. Zero before the first page.
    page: usize,
    has_more: bool,
    /// Bumped by every fresh load so an older `load_more` can tell its result
    /// is stale.
    generation: u64,
}

impl Pagination {
    pub fn state(&self) -> PaginationState {
        self.state
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Enter `Loading` for page 1. Returns the new generation, or `None`
    /// if a fresh load is already running.
    pub fn begin_load(&mut self) -> Option<u64> {
        if self.state == PaginationState::Loading {
            return None;
        }
        self.generation += 1;
        self.page = 0;
        self.has_more = true;
        self.state = PaginationState::Loading;
        Some(self.generation)
    }

    pub fn finish_load(&mut self, received: usize, page_size: usize) {
        self.page = 1;
        self.has_more = received >= page_size;
        self.state = match (received, self.has_more) {
            (0, _) => PaginationState::Empty,
            (_, true) => PaginationState::Loaded,
            (_, false) => PaginationState::Exhausted,
        };
    }

    pub fn fail_load(&mut self, generation: u64) {
        if generation == self.generation
            && self.state == PaginationState::Loading
        {
            self.state = PaginationState::Idle;
            self.has_more = false;
        }
    }

    pub fn can_load_more(&self) -> bool {
        self.state == PaginationState::Loaded && self.has_more
    }

    /// Enter `LoadingMore`. Returns `(generation, next page)`.
    pub fn begin_more(&mut self) -> Option<(u64, usize)> {
        if !self.can_load_more() {
            return None;
        }
        self.state = PaginationState::LoadingMore;
        Some((self.generation, self.page + 1))
    }

    /// Record a completed `load_more`. Returns false (changing nothing) when
    /// a fresh load superseded it.
    pub fn finish_more(
        &mut self,
        generation: u64,
        received: usize,
        page_size: usize,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.page += 1;
        self.has_more = received >= page_size;
        self.state = if self.has_more {
            PaginationState::Loaded
        } else {
            PaginationState::Exhausted
        };
        true
    }

    pub fn fail_more(&mut self, generation: u64) {
        if generation == self.generation
            && self.state == PaginationState::LoadingMore
        {
            self.state = PaginationState::Loaded;
        }
    }

    /// Back to `Idle` and invalidate anything pending.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.page = 0;
        self.has_more = false;
        self.state = PaginationState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_first_page_exhausts() {
        let mut p = Pagination::default();
        p.begin_load().expect("idle");
        p.finish_load(3, 20);
        assert_eq!(p.state(), PaginationState::Exhausted);
        assert!(!p.can_load_more());
    }

    #[test]
    fn empty_first_page_is_empty() {
        let mut p = Pagination::default();
        p.begin_load().expect("idle");
        p.finish_load(0, 20);
        assert_eq!(p.state(), PaginationState::Empty);
        assert!(p.begin_more().is_none());
    }

    #[test]
    fn page_advances_only_on_success() {
        let mut p = Pagination::default();
        let generation = p.begin_load().expect("idle");
        p.finish_load(2, 2);
        assert_eq!(p.begin_more(), Some((generation, 2)));
        assert!(p.begin_more().is_none(), "already loading more");

        p.fail_more(generation);
        assert_eq!(p.state(), PaginationState::Loaded);
        assert_eq!(p.page(), 1);

        assert_eq!(p.begin_more(), Some((generation, 2)));
        assert!(p.finish_more(generation, 1, 2));
        assert_eq!(p.page(), 2);
        assert_eq!(p.state(), PaginationState::Exhausted);
    }

    #[test]
    fn fresh_load_supersedes_pending_more() {
        let mut p = Pagination::default();
        let first = p.begin_load().expect("idle");
        p.finish_load(2, 2);
        p.begin_more().expect("loaded");

        let second = p.begin_load().expect("load during load_more");
        assert_ne!(first, second);
        assert!(!p.finish_more(first, 2, 2));
        assert_eq!(p.state(), PaginationState::Loading);
        assert_eq!(p.page(), 0);
    }

    #[test]
    fn failed_load_returns_to_idle() {
        let mut p = Pagination::default();
        let generation = p.begin_load().expect("idle");
        assert!(p.begin_load().is_none());
        p.fail_load(generation);
        assert_eq!(p.state(), PaginationState::Idle);
        assert!(!p.has_more());
    }
}
