use std::sync::Arc;

use crate::camera::Camera;
use crate::config::ViewerConfig;
use crate::error::{DispatchError, SortJobError, ViewerError};
use crate::leaf::{LeafRegistry, ViewUniforms};
use crate::octree::{NodeId, SpatialIndex};
use crate::scheduler::SortScheduler;
use crate::splat::SplatDataset;
use crate::transfer::{SortCompletion, SortJob, TransferChannel};
use crate::worker::SortWorker;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub completed: Option<NodeId>,
    pub failed: Option<SortJobError>,
    pub dispatched: Option<NodeId>,
    pub in_flight: bool,
}

/// Owns the index, the per-leaf render state and the sort pipeline for one
/// loaded dataset.
///
/// Dropping the viewer stops the worker without draining it; `shutdown`
/// applies the in-flight job first.
#[derive(Debug)]
pub struct SplatViewer {
    dataset: Arc<SplatDataset>,
    index: SpatialIndex,
    registry: LeafRegistry,
    scheduler: SortScheduler,
    // Declared before `worker`: dropping the channel is what stops the thread.
    channel: TransferChannel,
    worker: SortWorker,
    uniforms: ViewUniforms,
    config: ViewerConfig,
    frame: u64,
}

impl SplatViewer {
    pub fn new(dataset: SplatDataset, config: ViewerConfig) -> Result<Self, ViewerError> {
        let index = SpatialIndex::build(&dataset, config.index)?;
        let registry = LeafRegistry::from_index(&index, &dataset);
        let capacity = registry.max_vertex_count();

        let dataset = Arc::new(dataset);
        let (worker, channel) = SortWorker::spawn(Arc::clone(&dataset), capacity)?;
        let scheduler = SortScheduler::new(&registry, config.blend_order);
        tracing::info!(
            leaves = registry.len(),
            capacity,
            blend = config.blend_order.name(),
            "viewer ready"
        );

        Ok(Self {
            dataset,
            index,
            registry,
            scheduler,
            channel,
            worker,
            uniforms: ViewUniforms::default(),
            config,
            frame: 0,
        })
    }

    pub fn dataset(&self) -> &SplatDataset {
        &self.dataset
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn registry(&self) -> &LeafRegistry {
        &self.registry
    }

    /// Mutable access for the draw pass, which clears upload flags.
    pub fn registry_mut(&mut self) -> &mut LeafRegistry {
        &mut self.registry
    }

    pub fn scheduler(&self) -> &SortScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> ViewerConfig {
        self.config
    }

    pub fn uniforms(&self) -> ViewUniforms {
        self.uniforms
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn transfer_capacity(&self) -> usize {
        self.channel.capacity()
    }

    pub fn is_sort_in_flight(&self) -> bool {
        self.channel.is_busy()
    }

    /// One frame: apply a finished job if there is one, re-rank the leaves and
    /// dispatch the next pending leaf when the worker is idle. Never blocks.
    pub fn update(&mut self, camera: &Camera) -> Result<FrameStats, DispatchError> {
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };

        if let Some(completion) = self.channel.poll()? {
            self.consume(completion, &mut stats);
        }

        self.scheduler.rank_leaves(&mut self.registry, camera.position);

        if !self.channel.is_busy() {
            if let Some(leaf_id) = self.scheduler.next_pending() {
                self.dispatch(leaf_id, camera)?;
                stats.dispatched = Some(leaf_id);
            }
        }

        stats.in_flight = self.channel.is_busy();
        Ok(stats)
    }

    /// Recomputes the projection block for a new surface size and republishes it to every leaf.
    pub fn resize(&mut self, camera: &Camera, width: usize, height: usize) -> ViewUniforms {
        self.uniforms = ViewUniforms::compute(camera, width, height);
        self.registry.publish_uniforms(self.uniforms);
        self.uniforms
    }

    /// Blocks until the in-flight job, if any, has been applied.
    pub fn finish_pending(&mut self) -> Result<FrameStats, DispatchError> {
        let mut stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };
        if let Some(completion) = self.channel.wait()? {
            self.consume(completion, &mut stats);
        }
        Ok(stats)
    }

    pub fn shutdown(mut self) {
        if let Err(err) = self.finish_pending() {
            tracing::warn!("sort worker lost during shutdown: {err}");
        }
        let Self { channel, worker, .. } = self;
        drop(channel);
        worker.join();
    }

    fn dispatch(&mut self, leaf_id: NodeId, camera: &Camera) -> Result<(), DispatchError> {
        let Some(state) = self.registry.get(leaf_id) else {
            return Ok(());
        };
        let Some(data) = self.index.node(leaf_id).and_then(|node| node.leaf()) else {
            return Ok(());
        };
        let job = SortJob {
            leaf_id,
            vertex_count: state.vertex_count,
            view: camera.view_matrix(),
            camera_position: camera.position,
            blend_order: self.config.blend_order,
            frame: self.frame,
        };
        if let Err(err) = self.channel.dispatch(job, Arc::clone(&data.indices)) {
            self.scheduler.requeue(leaf_id);
            return Err(err);
        }
        Ok(())
    }

    fn consume(&mut self, completion: SortCompletion, stats: &mut FrameStats) {
        let SortCompletion {
            leaf_id,
            frame,
            outcome,
            buffers,
        } = completion;

        match outcome {
            Ok(written) => {
                if let Some(state) = self.registry.get_mut(leaf_id) {
                    debug_assert_eq!(written, state.vertex_count);
                    state.apply_sorted(&buffers, frame);
                }
                tracing::trace!(leaf = leaf_id, written, "sort job applied");
                stats.completed = Some(leaf_id);
            }
            Err(err) => {
                tracing::warn!("sort job failed: {err}");
                stats.failed = Some(err);
            }
        }
        self.channel.release(buffers);
    }
}
