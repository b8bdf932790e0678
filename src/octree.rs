//! Bounded-depth octree over splat centers.
//!
//! Nodes live in a flat arena and are addressed by [`NodeId`]. Ids are
//! assigned in depth-first pre-order with children visited in octant order,
//! so the arena order *is* the traversal order and two builds over the same
//! dataset and config produce identical ids.

use std::sync::Arc;

use glam::Vec3;

use crate::config::{IndexConfig, MAX_SUPPORTED_DEPTH};
use crate::error::BuildError;
use crate::splat::SplatDataset;

pub type NodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// True when the box has collapsed to a single point.
    pub fn is_point(&self) -> bool {
        self.extent().max_element() <= 0.0
    }

    /// Octant of `point` relative to `mid`: bit 0 = +x, bit 1 = +y, bit 2 = +z.
    fn octant_of(point: Vec3, mid: Vec3) -> usize {
        (point.x >= mid.x) as usize
            | ((point.y >= mid.y) as usize) << 1
            | ((point.z >= mid.z) as usize) << 2
    }

    fn octant_bounds(&self, octant: usize, mid: Vec3) -> Self {
        let pick = |bit: usize, lo: f32, m: f32, hi: f32| {
            if octant & bit != 0 {
                (m, hi)
            } else {
                (lo, m)
            }
        };
        let (min_x, max_x) = pick(1, self.min.x, mid.x, self.max.x);
        let (min_y, max_y) = pick(2, self.min.y, mid.y, self.max.y);
        let (min_z, max_z) = pick(4, self.min.z, mid.z, self.max.z);
        Self::new(Vec3::new(min_x, min_y, min_z), Vec3::new(max_x, max_y, max_z))
    }
}

/// Splat indices owned by a terminal node. Shared read-only with sort jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafData {
    pub indices: Arc<[u32]>,
}

impl Default for LeafData {
    fn default() -> Self {
        Self {
            indices: Arc::from(Vec::new()),
        }
    }
}

impl LeafData {
    pub fn vertex_count(&self) -> usize {
        self.indices.len()
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Internal { children: [NodeId; 8] },
    Leaf(LeafData),
}

#[derive(Debug, Clone)]
pub struct SpatialNode {
    pub id: NodeId,
    pub depth: u32,
    pub bounds: Aabb,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl SpatialNode {
    pub fn leaf(&self) -> Option<&LeafData> {
        match &self.kind {
            NodeKind::Leaf(data) => Some(data),
            NodeKind::Internal { .. } => None,
        }
    }

    pub fn children(&self) -> Option<&[NodeId; 8]> {
        match &self.kind {
            NodeKind::Internal { children } => Some(children),
            NodeKind::Leaf(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    nodes: Vec<SpatialNode>,
    config: IndexConfig,
    vertex_count: usize,
}

impl SpatialIndex {
    pub fn build(dataset: &SplatDataset, config: IndexConfig) -> Result<Self, BuildError> {
        if config.split_threshold == 0 || config.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(BuildError::InvalidConfig);
        }
        let (min, max) = dataset.bounds().ok_or(BuildError::EmptyDataset)?;
        let vertex_count = dataset.vertex_count();
        let indices: Vec<u32> = (0..vertex_count as u32).collect();

        let mut builder = Builder {
            dataset,
            config,
            nodes: Vec::new(),
        };
        builder.build_node(Aabb::new(min, max), 0, None, indices);

        let index = Self {
            nodes: builder.nodes,
            config,
            vertex_count,
        };
        tracing::info!(
            nodes = index.nodes.len(),
            leaves = index.count_leaves(),
            non_empty_leaves = index.count_leaves_with_vertices(),
            max_leaf_vertices = index.max_leaf_vertex_count(),
            depth = index.depth(),
            "built spatial index over {} splats",
            vertex_count
        );
        Ok(index)
    }

    pub fn config(&self) -> IndexConfig {
        self.config
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn root(&self) -> &SpatialNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> Option<&SpatialNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All leaves, empty ones included, in depth-first octant order.
    pub fn leaves(&self) -> impl Iterator<Item = (&SpatialNode, &LeafData)> + '_ {
        self.nodes
            .iter()
            .filter_map(|node| node.leaf().map(|data| (node, data)))
    }

    pub fn visit_leaves<F>(&self, mut callback: F)
    where
        F: FnMut(&SpatialNode, &LeafData),
    {
        for (node, data) in self.leaves() {
            callback(node, data);
        }
    }

    pub fn count_leaves(&self) -> usize {
        self.leaves().count()
    }

    pub fn count_leaves_with_vertices(&self) -> usize {
        self.leaves().filter(|(_, data)| data.vertex_count() > 0).count()
    }

    pub fn max_leaf_vertex_count(&self) -> usize {
        self.leaves()
            .map(|(_, data)| data.vertex_count())
            .max()
            .unwrap_or(0)
    }

    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }
}

struct Builder<'a> {
    dataset: &'a SplatDataset,
    config: IndexConfig,
    nodes: Vec<SpatialNode>,
}

impl Builder<'_> {
    fn build_node(
        &mut self,
        bounds: Aabb,
        depth: u32,
        parent: Option<NodeId>,
        indices: Vec<u32>,
    ) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(SpatialNode {
            id,
            depth,
            bounds,
            parent,
            kind: NodeKind::Leaf(LeafData::default()),
        });

        if depth >= self.config.max_depth
            || indices.len() < self.config.split_threshold
            || bounds.is_point()
        {
            self.nodes[id as usize].kind = NodeKind::Leaf(LeafData {
                indices: indices.into(),
            });
            return id;
        }

        let mid = bounds.center();
        let mut octants: [Vec<u32>; 8] = Default::default();
        for &index in &indices {
            let position = self.dataset.position(index as usize);
            octants[Aabb::octant_of(position, mid)].push(index);
        }

        // A split that hands every splat to a child as large as this node
        // cannot separate them at any depth.
        let stalled = octants.iter().enumerate().any(|(octant, subset)| {
            subset.len() == indices.len() && bounds.octant_bounds(octant, mid) == bounds
        });
        if stalled {
            self.nodes[id as usize].kind = NodeKind::Leaf(LeafData {
                indices: indices.into(),
            });
            return id;
        }

        let mut children = [0; 8];
        for (octant, subset) in octants.into_iter().enumerate() {
            let child_bounds = bounds.octant_bounds(octant, mid);
            children[octant] = self.build_node(child_bounds, depth + 1, Some(id), subset);
        }

        self.nodes[id as usize].kind = NodeKind::Internal { children };
        id
    }
}

#[cfg(test)]
mod tests;
