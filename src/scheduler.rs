use std::collections::BTreeSet;

use glam::Vec3;

use crate::config::BlendOrder;
use crate::leaf::LeafRegistry;
use crate::octree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedLeaf {
    pub leaf_id: NodeId,
    pub distance_sq: f32,
}

/// Per-frame leaf ranking plus the round-robin "needs sort" set.
///
/// Which leaf goes next is always nearest-first from the latest ranking; the
/// blend order only decides the render order handed to the draw pass.
#[derive(Debug)]
pub struct SortScheduler {
    pending: BTreeSet<NodeId>,
    ranked: Vec<RankedLeaf>,
    blend_order: BlendOrder,
}

impl SortScheduler {
    pub fn new(registry: &LeafRegistry, blend_order: BlendOrder) -> Self {
        let pending = registry
            .iter()
            .filter(|state| state.vertex_count > 0)
            .map(|state| state.leaf_id)
            .collect();
        Self {
            pending,
            ranked: Vec::with_capacity(registry.len()),
            blend_order,
        }
    }

    pub fn blend_order(&self) -> BlendOrder {
        self.blend_order
    }

    /// Latest ranking, nearest leaf first.
    pub fn ranked(&self) -> &[RankedLeaf] {
        &self.ranked
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, leaf_id: NodeId) -> bool {
        self.pending.contains(&leaf_id)
    }

    /// Ranks non-empty leaves by squared distance from `camera_position`
    /// (ties by id) and writes each leaf's render order.
    pub fn rank_leaves(&mut self, registry: &mut LeafRegistry, camera_position: Vec3) {
        self.ranked.clear();
        self.ranked.extend(
            registry
                .iter()
                .filter(|state| state.vertex_count > 0)
                .map(|state| RankedLeaf {
                    leaf_id: state.leaf_id,
                    distance_sq: state.center.distance_squared(camera_position),
                }),
        );
        self.ranked.sort_by(|a, b| {
            a.distance_sq
                .total_cmp(&b.distance_sq)
                .then(a.leaf_id.cmp(&b.leaf_id))
        });

        let count = self.ranked.len() as u32;
        for (rank, ranked) in self.ranked.iter().enumerate() {
            let Some(state) = registry.get_mut(ranked.leaf_id) else {
                continue;
            };
            state.render_order = match self.blend_order {
                BlendOrder::FrontToBack => rank as u32,
                BlendOrder::BackToFront => count - 1 - rank as u32,
            };
        }
    }

    /// Removes and returns the nearest pending leaf, refilling the set from
    /// the current ranking once every leaf has had its turn.
    pub fn next_pending(&mut self) -> Option<NodeId> {
        if self.pending.is_empty() {
            self.pending.extend(self.ranked.iter().map(|ranked| ranked.leaf_id));
        }
        let leaf_id = self
            .ranked
            .iter()
            .map(|ranked| ranked.leaf_id)
            .find(|leaf_id| self.pending.contains(leaf_id))?;
        self.pending.remove(&leaf_id);
        Some(leaf_id)
    }

    /// Puts a leaf back when its job could not be dispatched.
    pub fn requeue(&mut self, leaf_id: NodeId) {
        self.pending.insert(leaf_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::demo::generate_seeded_splats;
    use crate::octree::SpatialIndex;
    use crate::splat::SplatDataset;

    fn registry() -> LeafRegistry {
        let dataset = SplatDataset::from_splats(&generate_seeded_splats(2_000, 4.0, 17));
        let index = SpatialIndex::build(
            &dataset,
            IndexConfig {
                max_depth: 3,
                split_threshold: 100,
            },
        )
        .unwrap();
        LeafRegistry::from_index(&index, &dataset)
    }

    #[test]
    fn ranking_is_nearest_first_with_matching_render_order() {
        let mut registry = registry();
        let mut scheduler = SortScheduler::new(&registry, BlendOrder::FrontToBack);
        let camera = Vec3::new(10.0, 0.0, 0.0);
        scheduler.rank_leaves(&mut registry, camera);

        let ranked = scheduler.ranked();
        assert_eq!(ranked.len(), registry.len());
        assert!(ranked.windows(2).all(|w| w[0].distance_sq <= w[1].distance_sq));
        for (rank, entry) in ranked.iter().enumerate() {
            assert_eq!(registry.get(entry.leaf_id).unwrap().render_order, rank as u32);
        }
    }

    #[test]
    fn back_to_front_render_order_is_reversed() {
        let mut registry = registry();
        let mut scheduler = SortScheduler::new(&registry, BlendOrder::BackToFront);
        scheduler.rank_leaves(&mut registry, Vec3::new(0.0, 0.0, 12.0));

        let ranked = scheduler.ranked();
        let last = ranked.len() as u32 - 1;
        assert_eq!(registry.get(ranked[0].leaf_id).unwrap().render_order, last);
        assert_eq!(
            registry.get(ranked[ranked.len() - 1].leaf_id).unwrap().render_order,
            0
        );
    }

    #[test]
    fn every_leaf_is_picked_once_per_round() {
        let mut registry = registry();
        let mut scheduler = SortScheduler::new(&registry, BlendOrder::default());
        let total = registry.len();
        assert_eq!(scheduler.pending_len(), total);

        let mut picked = Vec::new();
        for frame in 0..total {
            let camera = Vec3::new(frame as f32, 3.0, -2.0);
            scheduler.rank_leaves(&mut registry, camera);
            let nearest_pending = scheduler
                .ranked()
                .iter()
                .find(|r| scheduler.is_pending(r.leaf_id))
                .map(|r| r.leaf_id);
            let leaf = scheduler.next_pending().unwrap();
            assert_eq!(Some(leaf), nearest_pending);
            picked.push(leaf);
        }
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), total);
        assert_eq!(scheduler.pending_len(), 0);

        // The next pick starts a new round.
        assert!(scheduler.next_pending().is_some());
        assert_eq!(scheduler.pending_len(), total - 1);
    }

    #[test]
    fn ties_break_by_leaf_id() {
        let mut registry = registry();
        let mut scheduler = SortScheduler::new(&registry, BlendOrder::default());
        for state in registry.iter_mut() {
            state.center = Vec3::ZERO;
        }
        scheduler.rank_leaves(&mut registry, Vec3::ONE);
        let ids: Vec<NodeId> = scheduler.ranked().iter().map(|r| r.leaf_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn empty_registry_never_picks() {
        let mut registry = LeafRegistry::default();
        let mut scheduler = SortScheduler::new(&registry, BlendOrder::default());
        scheduler.rank_leaves(&mut registry, Vec3::ZERO);
        assert_eq!(scheduler.next_pending(), None);
    }
}
