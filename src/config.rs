pub const DEFAULT_MAX_DEPTH: u32 = 8;
pub const DEFAULT_SPLIT_THRESHOLD: usize = 5_000;
/// Deepest tree `SpatialIndex::build` accepts.
pub const MAX_SUPPORTED_DEPTH: u32 = 24;

/// Draw direction shared by the per-leaf render order and the per-splat sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendOrder {
    /// Farthest first, as "over" compositing expects.
    #[default]
    BackToFront,
    FrontToBack,
}

impl BlendOrder {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BackToFront => "back-to-front",
            Self::FrontToBack => "front-to-back",
        }
    }

    /// Orders two distances so that the one drawn first compares `Less`.
    pub fn compare(self, a: f32, b: f32) -> std::cmp::Ordering {
        match self {
            Self::BackToFront => b.total_cmp(&a),
            Self::FrontToBack => a.total_cmp(&b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    pub max_depth: u32,
    /// Nodes holding fewer splats than this are not split further.
    pub split_threshold: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewerConfig {
    pub index: IndexConfig,
    pub blend_order: BlendOrder,
}
