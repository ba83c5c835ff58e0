use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::ModelError;

/// Id prefixes reserved for synthetic or placeholder feed entries. Such items
/// are rendered but never take part in caching or prefetching.
pub const SYNTHETIC_ID_PREFIXES: &[&str] =
    &["placeholder-", "synthetic-", "temp-"];

/// Stable, unique identifier of one feed item (a marker).
///
/// Cheap to clone: the string is shared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(Arc<str>);

impl ItemId {
    /// Build an id, rejecting empty or whitespace-only input.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ModelError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(ModelError::InvalidId("empty".into()));
        }
        Ok(Self(Arc::from(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for ids that carry one of [`SYNTHETIC_ID_PREFIXES`].
    pub fn is_synthetic(&self) -> bool {
        SYNTHETIC_ID_PREFIXES
            .iter()
            .any(|prefix| self.0.starts_with(prefix))
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a rendered element (container or sentinel).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementId(pub Uuid);

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementId {
    pub fn new() -> Self {
        ElementId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_rejects_blank() {
        assert_eq!(ItemId::parse("  m-12 ").unwrap().as_str(), "m-12");
        assert!(matches!(
            ItemId::parse("   "),
            Err(ModelError::InvalidId(_))
        ));
    }

    #[test]
    fn synthetic_prefixes_are_detected() {
        assert!(ItemId::from("placeholder-3").is_synthetic());
        assert!(ItemId::from("temp-x").is_synthetic());
        assert!(!ItemId::from("marker-placeholder").is_synthetic());
    }

    #[test]
    fn element_ids_are_time_ordered_v7() {
        let first = ElementId::new();
        let second = ElementId::new();
        assert_eq!(first.as_uuid().get_version_num(), 7);
        assert_ne!(first, second);
    }
}
