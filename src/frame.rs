use std::time::{Duration, Instant};

use glam::Vec3;

use crate::camera::{orbit, Camera};
use crate::error::DispatchError;
use crate::viewer::SplatViewer;

pub const FRAME_TARGET: Duration = Duration::from_millis(8);
const ORBIT_SPEED: f32 = 0.55;

#[derive(Debug, Clone, Copy)]
pub struct OrbitState {
    pub target: Vec3,
    pub angle: f32,
    pub radius: f32,
    pub height: f32,
}

impl OrbitState {
    pub fn advance(&mut self, camera: &mut Camera, delta_time: f32) {
        self.angle += ORBIT_SPEED * delta_time;
        orbit(camera, self.target, self.radius, self.height, self.angle);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopSummary {
    pub frames: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub uploads: u64,
    pub resizes: u64,
    pub fps: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub frames: u64,
    /// Fixed timestep instead of wall clock; also disables pacing.
    pub fixed_delta: Option<f32>,
    pub log_every: u64,
}

/// Drives the viewer like a display callback: advance the orbit, follow the
/// surface size, update, then consume upload flags as the draw pass would.
pub fn run_frame_loop<S>(
    viewer: &mut SplatViewer,
    camera: &mut Camera,
    orbit_state: &mut OrbitState,
    options: LoopOptions,
    mut surface_size: S,
) -> Result<LoopSummary, DispatchError>
where
    S: FnMut() -> (usize, usize),
{
    let mut summary = LoopSummary::default();
    let mut surface = None;
    let mut last_frame_time = Instant::now();

    for _ in 0..options.frames {
        let frame_start = Instant::now();
        let delta_time = match options.fixed_delta {
            Some(delta) => delta,
            None => frame_start
                .duration_since(last_frame_time)
                .as_secs_f32()
                .max(1e-6),
        };
        last_frame_time = frame_start;
        orbit_state.advance(camera, delta_time);

        let size = surface_size();
        if surface != Some(size) {
            viewer.resize(camera, size.0, size.1);
            surface = Some(size);
            summary.resizes += 1;
        }

        let stats = viewer.update(camera)?;
        summary.frames += 1;
        summary.dispatched += stats.dispatched.is_some() as u64;
        summary.completed += stats.completed.is_some() as u64;
        summary.failed += stats.failed.is_some() as u64;
        for state in viewer.registry_mut().iter_mut() {
            summary.uploads += state.take_upload() as u64;
        }

        let instant_fps = 1.0 / delta_time;
        summary.fps = if summary.fps <= 0.01 {
            instant_fps
        } else {
            0.90 * summary.fps + 0.10 * instant_fps
        };

        if options.log_every > 0 && stats.frame % options.log_every == 0 {
            tracing::info!(
                frame = stats.frame,
                fps = summary.fps,
                completed = summary.completed,
                pending = viewer.scheduler().pending_len(),
                "frame"
            );
        }

        if options.fixed_delta.is_none() {
            let spent = frame_start.elapsed();
            if spent < FRAME_TARGET {
                std::thread::sleep(FRAME_TARGET - spent);
            }
        }
    }

    Ok(summary)
}
