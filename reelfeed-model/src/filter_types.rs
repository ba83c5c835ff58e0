use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortField {
    #[default]
    CreatedAt,
    Title,
    SceneDate,
    Random,
}

impl SortField {
    pub fn api_name(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::SceneDate => "scene_date",
            SortField::Random => "random",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Filter set a feed is loaded for. Changing any field means a fresh
/// `load`, which restarts pagination at page 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedFilters {
    pub query: Option<String>,
    pub tags: Vec<String>,
    pub performers: Vec<String>,
    pub sort: SortField,
    pub direction: SortDirection,
    /// Seed for `SortField::Random` so pages stay consistent.
    pub seed: Option<u64>,
}

impl FeedFilters {
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn sorted_by(mut self, sort: SortField, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }
}

impl fmt::Display for FeedFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "query={:?} tags={} performers={} sort={}",
            self.query.as_deref().unwrap_or(""),
            self.tags.len(),
            self.performers.len(),
            self.sort.api_name()
        )
    }
}
