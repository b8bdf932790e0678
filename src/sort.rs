use crate::error::SortJobError;
use crate::splat::{SplatDataset, CENTER_COVARIANCE_STRIDE, COLOR_STRIDE};
use crate::transfer::{SortJob, TransferBuffers};

/// Reusable `(key, splat index)` pairs owned by the worker.
#[derive(Debug, Default)]
pub struct SortScratch {
    keyed: Vec<(f32, u32)>,
}

impl SortScratch {
    pub fn order(&self) -> impl Iterator<Item = u32> + '_ {
        self.keyed.iter().map(|&(_, index)| index)
    }
}

fn validate(
    dataset: &SplatDataset,
    job: &SortJob,
    indices: &[u32],
    capacity: usize,
) -> Result<(), SortJobError> {
    let leaf_id = job.leaf_id;
    if job.vertex_count > capacity {
        return Err(SortJobError::CapacityExceeded {
            leaf_id,
            vertex_count: job.vertex_count,
            capacity,
        });
    }
    if job.vertex_count != indices.len() {
        return Err(SortJobError::VertexCountMismatch {
            leaf_id,
            vertex_count: job.vertex_count,
            indices: indices.len(),
        });
    }
    if !job.view.is_finite() || !job.camera_position.is_finite() {
        return Err(SortJobError::NonFiniteView { leaf_id });
    }
    if let Some(&index) = indices
        .iter()
        .find(|&&index| index as usize >= dataset.vertex_count())
    {
        return Err(SortJobError::IndexOutOfRange { leaf_id, index });
    }
    Ok(())
}

/// Orders `keyed` by squared camera-space distance; stable, so equal keys keep input order.
pub fn sort_by_distance(
    dataset: &SplatDataset,
    job: &SortJob,
    indices: &[u32],
    scratch: &mut SortScratch,
) {
    scratch.keyed.clear();
    scratch.keyed.extend(indices.iter().map(|&index| {
        let view_pos = job.view.transform_point3(dataset.position(index as usize));
        (view_pos.length_squared(), index)
    }));
    scratch.keyed.sort_by(|a, b| job.blend_order.compare(a.0, b.0));
}

/// Runs one job: validates it, sorts the leaf and writes the permuted
/// attributes into the first `vertex_count` slots of `buffers`.
pub fn run_sort_job(
    dataset: &SplatDataset,
    job: &SortJob,
    indices: &[u32],
    buffers: &mut TransferBuffers,
    scratch: &mut SortScratch,
) -> Result<usize, SortJobError> {
    validate(dataset, job, indices, buffers.capacity())?;
    sort_by_distance(dataset, job, indices, scratch);

    let (colors, center_covariances) = buffers.split_mut();
    for ((index, color), packed) in scratch
        .order()
        .zip(colors.chunks_exact_mut(COLOR_STRIDE))
        .zip(center_covariances.chunks_exact_mut(CENTER_COVARIANCE_STRIDE))
    {
        color.copy_from_slice(dataset.color(index as usize));
        dataset.write_center_covariance(index as usize, packed);
    }
    Ok(job.vertex_count)
}
