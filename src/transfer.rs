//! Job hand-off between the frame loop and the sort worker.
//!
//! The transfer buffers travel *inside* the messages: a request moves them to
//! the worker, the completion moves them back. Whoever holds the value may
//! write it, so the requester and the worker can never touch them at the same
//! time, and no attribute data is copied on the way.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::config::BlendOrder;
use crate::error::{DispatchError, SortJobError};
use crate::octree::NodeId;
use crate::splat::{CENTER_COVARIANCE_STRIDE, COLOR_STRIDE};

/// View snapshot captured when a leaf is picked for sorting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortJob {
    pub leaf_id: NodeId,
    pub vertex_count: usize,
    pub view: Mat4,
    pub camera_position: Vec3,
    pub blend_order: BlendOrder,
    pub frame: u64,
}

#[derive(Debug, Clone)]
pub struct TransferBuffers {
    colors: Vec<f32>,
    center_covariances: Vec<f32>,
    capacity: usize,
}

impl TransferBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            colors: vec![0.0; capacity * COLOR_STRIDE],
            center_covariances: vec![0.0; capacity * CENTER_COVARIANCE_STRIDE],
            capacity,
        }
    }

    /// Maximum number of splats one job may write.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn center_covariances(&self) -> &[f32] {
        &self.center_covariances
    }

    pub fn split_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.colors, &mut self.center_covariances)
    }
}

#[derive(Debug)]
pub struct SortRequest {
    pub job: SortJob,
    pub indices: Arc<[u32]>,
    pub buffers: TransferBuffers,
}

#[derive(Debug)]
pub struct SortCompletion {
    pub leaf_id: NodeId,
    pub frame: u64,
    /// Number of splats written, or why the job was rejected.
    pub outcome: Result<usize, SortJobError>,
    pub buffers: TransferBuffers,
}

impl SortCompletion {
    pub fn done(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug)]
enum ChannelState {
    Idle(TransferBuffers),
    InFlight { leaf_id: NodeId },
    /// Completion received; buffers are with the consumer until released.
    Delivered { leaf_id: NodeId },
}

/// Requester side of the worker mailbox.
#[derive(Debug)]
pub struct TransferChannel {
    requests: Sender<SortRequest>,
    completions: Receiver<SortCompletion>,
    state: ChannelState,
    capacity: usize,
}

impl TransferChannel {
    pub fn new(
        requests: Sender<SortRequest>,
        completions: Receiver<SortCompletion>,
        buffers: TransferBuffers,
    ) -> Self {
        Self {
            requests,
            completions,
            capacity: buffers.capacity(),
            state: ChannelState::Idle(buffers),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True from dispatch until the completed buffers are released.
    pub fn is_busy(&self) -> bool {
        !matches!(self.state, ChannelState::Idle(_))
    }

    pub fn in_flight_leaf(&self) -> Option<NodeId> {
        match self.state {
            ChannelState::Idle(_) => None,
            ChannelState::InFlight { leaf_id } | ChannelState::Delivered { leaf_id } => {
                Some(leaf_id)
            }
        }
    }

    pub fn dispatch(&mut self, job: SortJob, indices: Arc<[u32]>) -> Result<(), DispatchError> {
        if let Some(leaf_id) = self.in_flight_leaf() {
            return Err(DispatchError::InFlight { leaf_id });
        }
        let in_flight = ChannelState::InFlight {
            leaf_id: job.leaf_id,
        };
        let ChannelState::Idle(buffers) = std::mem::replace(&mut self.state, in_flight) else {
            unreachable!("channel checked idle above");
        };

        let request = SortRequest {
            job,
            indices,
            buffers,
        };
        if let Err(err) = self.requests.send(request) {
            self.state = ChannelState::Idle(err.0.buffers);
            return Err(DispatchError::WorkerDisconnected);
        }
        tracing::trace!(leaf = job.leaf_id, vertices = job.vertex_count, "sort job dispatched");
        Ok(())
    }

    /// Non-blocking check for the in-flight job's completion.
    pub fn poll(&mut self) -> Result<Option<SortCompletion>, DispatchError> {
        let ChannelState::InFlight { .. } = self.state else {
            return Ok(None);
        };
        match self.completions.try_recv() {
            Ok(completion) => Ok(Some(self.deliver(completion))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(DispatchError::WorkerDisconnected),
        }
    }

    /// Blocks until the in-flight job completes; `None` when nothing is in flight.
    pub fn wait(&mut self) -> Result<Option<SortCompletion>, DispatchError> {
        let ChannelState::InFlight { .. } = self.state else {
            return Ok(None);
        };
        match self.completions.recv() {
            Ok(completion) => Ok(Some(self.deliver(completion))),
            Err(_) => Err(DispatchError::WorkerDisconnected),
        }
    }

    /// Hands the buffers back once their contents have been consumed.
    pub fn release(&mut self, buffers: TransferBuffers) {
        if !matches!(self.state, ChannelState::Delivered { .. }) {
            tracing::warn!("transfer buffers released without a delivered completion");
        }
        self.state = ChannelState::Idle(buffers);
    }

    fn deliver(&mut self, completion: SortCompletion) -> SortCompletion {
        self.state = ChannelState::Delivered {
            leaf_id: completion.leaf_id,
        };
        completion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn job(leaf_id: NodeId) -> SortJob {
        SortJob {
            leaf_id,
            vertex_count: 2,
            view: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
            blend_order: BlendOrder::default(),
            frame: 0,
        }
    }

    #[test]
    fn second_dispatch_is_refused_until_release() {
        let (req_tx, req_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let mut channel = TransferChannel::new(req_tx, done_rx, TransferBuffers::new(4));
        let indices: Arc<[u32]> = Arc::from(vec![0, 1]);

        channel.dispatch(job(3), indices.clone()).unwrap();
        assert!(channel.is_busy());
        assert_eq!(
            channel.dispatch(job(5), indices.clone()),
            Err(DispatchError::InFlight { leaf_id: 3 })
        );
        assert!(channel.poll().unwrap().is_none());

        let request = req_rx.recv().unwrap();
        done_tx
            .send(SortCompletion {
                leaf_id: request.job.leaf_id,
                frame: request.job.frame,
                outcome: Ok(2),
                buffers: request.buffers,
            })
            .unwrap();

        let completion = channel.wait().unwrap().unwrap();
        assert!(completion.done());
        assert_eq!(channel.in_flight_leaf(), Some(3));
        assert!(channel.dispatch(job(5), indices.clone()).is_err());

        channel.release(completion.buffers);
        assert!(!channel.is_busy());
        channel.dispatch(job(5), indices).unwrap();
        assert_eq!(channel.in_flight_leaf(), Some(5));
    }

    #[test]
    fn dispatch_to_dead_worker_keeps_buffers() {
        let (req_tx, req_rx) = mpsc::channel();
        let (_done_tx, done_rx) = mpsc::channel();
        drop(req_rx);
        let mut channel = TransferChannel::new(req_tx, done_rx, TransferBuffers::new(4));

        assert_eq!(
            channel.dispatch(job(1), Arc::from(vec![0u32])),
            Err(DispatchError::WorkerDisconnected)
        );
        assert!(!channel.is_busy());
        assert_eq!(channel.capacity(), 4);
    }
}
