use glam::{Mat3, Quat, Vec3};
use rayon::prelude::*;

/// Floats per splat in the raw attribute buffer:
/// position (3), scale (3), rotation wxyz (4), rgba (4).
pub const RAW_STRIDE: usize = 14;
pub const COVARIANCE_STRIDE: usize = 6;
pub const COLOR_STRIDE: usize = 4;
pub const CENTER_COVARIANCE_STRIDE: usize = 3 + COVARIANCE_STRIDE;

const MIN_SCALE: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct Splat {
    pub position: Vec3,
    pub color: [u8; 3],
    pub opacity: f32,
    pub scale: Vec3,
    /// Quaternion as `[w, x, y, z]`.
    pub rotation: [f32; 4],
}

/// Upper triangle `[xx, xy, xz, yy, yz, zz]` of `R * diag(s^2) * R^T`.
pub fn compute_3d_covariance(scale: Vec3, rotation: [f32; 4]) -> [f32; COVARIANCE_STRIDE] {
    let [w, x, y, z] = rotation;
    let quat = Quat::from_xyzw(x, y, z, w);
    let quat = if quat.length_squared() > 1e-12 {
        quat.normalize()
    } else {
        Quat::IDENTITY
    };
    let r = Mat3::from_quat(quat);
    let s = scale.max(Vec3::splat(MIN_SCALE));
    let d = Mat3::from_diagonal(s * s);
    let cov = r * d * r.transpose();

    [
        cov.x_axis.x,
        cov.y_axis.x,
        cov.z_axis.x,
        cov.y_axis.y,
        cov.z_axis.y,
        cov.z_axis.z,
    ]
}

/// Immutable, loaded collection of splats exposed as flat attribute arrays.
#[derive(Debug, Clone)]
pub struct SplatDataset {
    raw: Vec<f32>,
    covariances: Vec<f32>,
    colors: Vec<f32>,
    vertex_count: usize,
}

impl SplatDataset {
    pub fn from_splats(splats: &[Splat]) -> Self {
        let vertex_count = splats.len();
        let mut raw = Vec::with_capacity(vertex_count * RAW_STRIDE);
        let mut colors = Vec::with_capacity(vertex_count * COLOR_STRIDE);

        for splat in splats {
            let rgba = [
                splat.color[0] as f32 / 255.0,
                splat.color[1] as f32 / 255.0,
                splat.color[2] as f32 / 255.0,
                splat.opacity.clamp(0.0, 1.0),
            ];
            raw.extend_from_slice(&splat.position.to_array());
            raw.extend_from_slice(&splat.scale.to_array());
            raw.extend_from_slice(&splat.rotation);
            raw.extend_from_slice(&rgba);
            colors.extend_from_slice(&rgba);
        }

        let mut covariances = vec![0.0; vertex_count * COVARIANCE_STRIDE];
        covariances
            .par_chunks_mut(COVARIANCE_STRIDE)
            .zip(splats.par_iter())
            .for_each(|(out, splat)| {
                out.copy_from_slice(&compute_3d_covariance(splat.scale, splat.rotation));
            });

        Self {
            raw,
            covariances,
            colors,
            vertex_count,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    pub fn raw(&self) -> &[f32] {
        &self.raw
    }

    pub fn covariances(&self) -> &[f32] {
        &self.covariances
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let base = index * RAW_STRIDE;
        Vec3::from_slice(&self.raw[base..base + 3])
    }

    pub fn covariance(&self, index: usize) -> &[f32] {
        let base = index * COVARIANCE_STRIDE;
        &self.covariances[base..base + COVARIANCE_STRIDE]
    }

    pub fn color(&self, index: usize) -> &[f32] {
        let base = index * COLOR_STRIDE;
        &self.colors[base..base + COLOR_STRIDE]
    }

    /// Axis-aligned bounds of all splat centers, `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        if self.is_empty() {
            return None;
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..self.vertex_count {
            let p = self.position(i);
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }

    /// Writes `center(3) + covariance(6)` for splat `index` into `out`.
    pub fn write_center_covariance(&self, index: usize, out: &mut [f32]) {
        out[..3].copy_from_slice(&self.position(index).to_array());
        out[3..CENTER_COVARIANCE_STRIDE].copy_from_slice(self.covariance(index));
    }
}
