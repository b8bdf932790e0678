use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::sort::{run_sort_job, SortScratch};
use crate::splat::SplatDataset;
use crate::transfer::{SortCompletion, SortRequest, TransferBuffers, TransferChannel};

/// Handle to the background sort thread. The thread exits once the
/// [`TransferChannel`] it was spawned with is dropped, and dropping the
/// handle joins it, so drop the channel first.
#[derive(Debug)]
pub struct SortWorker {
    handle: Option<JoinHandle<()>>,
}

impl SortWorker {
    /// Spawns the worker and returns it with the requester end of its mailbox,
    /// which starts out holding a fresh buffer pair of `capacity` splats.
    pub fn spawn(
        dataset: Arc<SplatDataset>,
        capacity: usize,
    ) -> std::io::Result<(Self, TransferChannel)> {
        let (request_tx, request_rx) = mpsc::channel();
        let (completion_tx, completion_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("splat-sort".to_string())
            .spawn(move || worker_loop(&dataset, request_rx, completion_tx))?;

        let channel =
            TransferChannel::new(request_tx, completion_rx, TransferBuffers::new(capacity));
        Ok((
            Self {
                handle: Some(handle),
            },
            channel,
        ))
    }

    /// Waits for the thread to exit. The channel must already be dropped.
    pub fn join(mut self) {
        self.join_thread();
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("sort worker panicked");
            }
        }
    }
}

impl Drop for SortWorker {
    fn drop(&mut self) {
        self.join_thread();
    }
}

fn worker_loop(
    dataset: &SplatDataset,
    requests: Receiver<SortRequest>,
    completions: Sender<SortCompletion>,
) {
    tracing::debug!("sort worker started");
    let mut scratch = SortScratch::default();

    for request in requests {
        let SortRequest {
            job,
            indices,
            mut buffers,
        } = request;
        let outcome = run_sort_job(dataset, &job, &indices, &mut buffers, &mut scratch);
        let completion = SortCompletion {
            leaf_id: job.leaf_id,
            frame: job.frame,
            outcome,
            buffers,
        };
        if completions.send(completion).is_err() {
            break;
        }
    }
    tracing::debug!("sort worker stopped");
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::config::BlendOrder;
    use crate::demo::generate_seeded_splats;
    use crate::error::SortJobError;
    use crate::transfer::SortJob;

    fn job(leaf_id: u32, vertex_count: usize) -> SortJob {
        SortJob {
            leaf_id,
            vertex_count,
            view: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
            blend_order: BlendOrder::BackToFront,
            frame: 7,
        }
    }

    #[test]
    fn worker_round_trips_jobs_and_buffers() {
        let dataset = Arc::new(SplatDataset::from_splats(&generate_seeded_splats(64, 1.0, 1)));
        let (worker, mut channel) = SortWorker::spawn(dataset, 16).unwrap();

        let indices: Arc<[u32]> = (0..16).collect::<Vec<u32>>().into();
        channel.dispatch(job(4, 16), indices).unwrap();
        let completion = channel.wait().unwrap().unwrap();
        assert_eq!(completion.leaf_id, 4);
        assert_eq!(completion.frame, 7);
        assert_eq!(completion.outcome, Ok(16));
        assert_eq!(completion.buffers.capacity(), 16);
        channel.release(completion.buffers);

        // A rejected job still returns the buffers.
        let indices: Arc<[u32]> = (0..20).collect::<Vec<u32>>().into();
        channel.dispatch(job(5, 20), indices).unwrap();
        let completion = channel.wait().unwrap().unwrap();
        assert!(!completion.done());
        assert!(matches!(
            completion.outcome,
            Err(SortJobError::CapacityExceeded { leaf_id: 5, .. })
        ));
        channel.release(completion.buffers);
        assert!(!channel.is_busy());

        drop(channel);
        worker.join();
    }

    #[test]
    fn dropping_worker_after_channel_joins_thread() {
        let dataset = Arc::new(SplatDataset::from_splats(&generate_seeded_splats(32, 1.0, 2)));
        let (worker, mut channel) = SortWorker::spawn(dataset, 32).unwrap();
        let indices: Arc<[u32]> = (0..32).collect::<Vec<u32>>().into();
        channel.dispatch(job(1, 32), indices).unwrap();

        drop(channel);
        drop(worker);
    }
}
