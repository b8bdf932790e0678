use std::collections::BTreeMap;

use glam::{Mat4, Vec2, Vec3};

use crate::camera::Camera;
use crate::octree::{LeafData, NodeId, SpatialIndex};
use crate::splat::{SplatDataset, CENTER_COVARIANCE_STRIDE, COLOR_STRIDE};
use crate::transfer::TransferBuffers;

/// Projection, focal and viewport block shared by every leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewUniforms {
    pub projection: Mat4,
    pub focal: Vec2,
    pub viewport: Vec2,
}

impl ViewUniforms {
    pub fn compute(camera: &Camera, width: usize, height: usize) -> Self {
        Self {
            projection: camera.projection_matrix(width, height),
            focal: camera.focal_lengths(width, height),
            viewport: Vec2::new(width.max(1) as f32, height.max(1) as f32),
        }
    }
}

impl Default for ViewUniforms {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            focal: Vec2::ONE,
            viewport: Vec2::ONE,
        }
    }
}

/// GPU-facing buffers of one non-empty leaf.
#[derive(Debug, Clone)]
pub struct LeafRenderState {
    pub leaf_id: NodeId,
    pub center: Vec3,
    pub vertex_count: usize,
    pub colors: Vec<f32>,
    pub center_covariances: Vec<f32>,
    pub render_order: u32,
    pub uniforms: ViewUniforms,
    pub needs_upload: bool,
    pub uniforms_dirty: bool,
    pub sorted_frame: Option<u64>,
}

impl LeafRenderState {
    /// Seeds the buffers in index order so the leaf is drawable before its first sort.
    pub fn new(leaf_id: NodeId, center: Vec3, data: &LeafData, dataset: &SplatDataset) -> Self {
        let vertex_count = data.vertex_count();
        let mut colors = vec![0.0; vertex_count * COLOR_STRIDE];
        let mut center_covariances = vec![0.0; vertex_count * CENTER_COVARIANCE_STRIDE];

        for ((&index, color), packed) in data
            .indices
            .iter()
            .zip(colors.chunks_exact_mut(COLOR_STRIDE))
            .zip(center_covariances.chunks_exact_mut(CENTER_COVARIANCE_STRIDE))
        {
            color.copy_from_slice(dataset.color(index as usize));
            dataset.write_center_covariance(index as usize, packed);
        }

        Self {
            leaf_id,
            center,
            vertex_count,
            colors,
            center_covariances,
            render_order: 0,
            uniforms: ViewUniforms::default(),
            needs_upload: true,
            uniforms_dirty: true,
            sorted_frame: None,
        }
    }

    /// Copies the valid prefix of the transfer buffers into this leaf.
    pub fn apply_sorted(&mut self, buffers: &TransferBuffers, frame: u64) {
        let colors_len = self.vertex_count * COLOR_STRIDE;
        let packed_len = self.vertex_count * CENTER_COVARIANCE_STRIDE;
        self.colors.copy_from_slice(&buffers.colors()[..colors_len]);
        self.center_covariances
            .copy_from_slice(&buffers.center_covariances()[..packed_len]);
        self.needs_upload = true;
        self.sorted_frame = Some(frame);
    }

    pub fn set_uniforms(&mut self, uniforms: ViewUniforms) {
        if self.uniforms != uniforms {
            self.uniforms = uniforms;
            self.uniforms_dirty = true;
        }
    }

    /// Clears the upload flag, returning whether buffers changed since the last call.
    pub fn take_upload(&mut self) -> bool {
        std::mem::take(&mut self.needs_upload)
    }
}

/// Leaf id to render state, one entry per non-empty leaf.
#[derive(Debug, Clone, Default)]
pub struct LeafRegistry {
    states: BTreeMap<NodeId, LeafRenderState>,
    max_vertex_count: usize,
}

impl LeafRegistry {
    pub fn from_index(index: &SpatialIndex, dataset: &SplatDataset) -> Self {
        let mut states = BTreeMap::new();
        let mut max_vertex_count = 0;
        index.visit_leaves(|node, data| {
            if data.vertex_count() == 0 {
                return;
            }
            max_vertex_count = max_vertex_count.max(data.vertex_count());
            states.insert(
                node.id,
                LeafRenderState::new(node.id, node.bounds.center(), data, dataset),
            );
        });
        Self {
            states,
            max_vertex_count,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Largest leaf vertex count, used to size the transfer buffers.
    pub fn max_vertex_count(&self) -> usize {
        self.max_vertex_count
    }

    pub fn get(&self, id: NodeId) -> Option<&LeafRenderState> {
        self.states.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut LeafRenderState> {
        self.states.get_mut(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.states.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LeafRenderState> {
        self.states.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LeafRenderState> {
        self.states.values_mut()
    }

    pub fn publish_uniforms(&mut self, uniforms: ViewUniforms) {
        for state in self.states.values_mut() {
            state.set_uniforms(uniforms);
        }
    }
}
