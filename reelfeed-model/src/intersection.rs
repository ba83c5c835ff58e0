use crate::element::ElementRef;

/// Extra margin, in pixels, added around the viewport before intersection
/// is computed. Positive values fire early ("pre-roll").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RootMargin {
    pub top: i32,
    pub bottom: i32,
}

impl RootMargin {
    pub const ZERO: RootMargin = RootMargin { top: 0, bottom: 0 };

    /// Same margin above and below the viewport.
    pub const fn vertical(px: i32) -> Self {
        Self {
            top: px,
            bottom: px,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0 && self.bottom == 0
    }
}

impl std::fmt::Display for RootMargin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}px 0px {}px 0px", self.top, self.bottom)
    }
}

/// Options handed to the viewport when an observer is created.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    /// Ratios at which the platform should report a change.
    pub thresholds: Vec<f32>,
    pub root_margin: RootMargin,
}

impl ObserverOptions {
    pub fn new(thresholds: Vec<f32>, root_margin: RootMargin) -> Self {
        Self {
            thresholds,
            root_margin,
        }
    }

    /// Report as soon as any pixel of the target enters the margin band.
    pub fn proximity(root_margin: RootMargin) -> Self {
        Self::new(vec![0.0], root_margin)
    }
}

/// One record in an intersection batch.
#[derive(Debug, Clone)]
pub struct IntersectionEntry {
    pub target: ElementRef,
    pub is_intersecting: bool,
    pub intersection_ratio: f32,
}

impl IntersectionEntry {
    pub fn new(
        target: ElementRef,
        is_intersecting: bool,
        intersection_ratio: f32,
    ) -> Self {
        Self {
            target,
            is_intersecting,
            intersection_ratio,
        }
    }

    /// Whether the target counts as visible at `threshold`.
    pub fn meets(&self, threshold: f32) -> bool {
        self.is_intersecting && self.intersection_ratio >= threshold
    }
}
