use clap::Parser;
use glam::Vec3;
use std::path::PathBuf;

use splatsort::camera::{look_at_target, Camera};
use splatsort::config::{BlendOrder, IndexConfig, ViewerConfig};
use splatsort::frame::{run_frame_loop, LoopOptions, OrbitState};
use splatsort::splat::SplatDataset;
use splatsort::{demo, logging, parser, SplatViewer};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

const FALLBACK_SURFACE: (usize, usize) = (120, 40);

#[derive(Debug, Parser)]
#[command(
    name = "splatsort",
    version,
    about = "Octree-partitioned Gaussian splat viewer core with asynchronous depth sorting"
)]
struct Cli {
    /// Path to a .splat scene file (runs demo if omitted)
    input: Option<PathBuf>,
    #[arg(long, help = "Run built-in demo scene", conflicts_with = "input")]
    demo: bool,
    #[arg(long, value_name = "N", default_value_t = 600, help = "Frames to drive")]
    frames: u64,
    #[arg(long, value_name = "PX", help = "Surface width (terminal width if omitted)")]
    width: Option<usize>,
    #[arg(long, value_name = "PX", help = "Surface height (terminal height if omitted)")]
    height: Option<usize>,
    #[arg(
        long,
        default_value_t = splatsort::config::DEFAULT_MAX_DEPTH,
        value_parser = clap::value_parser!(u32)
            .range(..=i64::from(splatsort::config::MAX_SUPPORTED_DEPTH))
    )]
    max_depth: u32,
    #[arg(long, default_value_t = splatsort::config::DEFAULT_SPLIT_THRESHOLD)]
    split_threshold: usize,
    #[arg(long, help = "Sort nearest splats first")]
    front_to_back: bool,
    #[arg(long, default_value_t = 42, help = "Seed for the demo scene")]
    seed: u64,
    #[arg(long, help = "Use a fixed 60 Hz timestep without frame pacing")]
    fixed_step: bool,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn load_dataset_from_cli(cli: &Cli) -> AppResult<SplatDataset> {
    match cli.input.as_ref() {
        Some(path) if !cli.demo => Ok(parser::load_dataset(path)?),
        _ => Ok(demo::generate_demo_dataset(cli.seed)),
    }
}

fn surface_size(cli: &Cli) -> (usize, usize) {
    let (cols, rows) = crossterm::terminal::size()
        .map(|(c, r)| (c as usize, r as usize))
        .unwrap_or(FALLBACK_SURFACE);
    (
        cli.width.unwrap_or(cols).max(1),
        cli.height.unwrap_or(rows).max(1),
    )
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    logging::setup_tracing(logging::level_for_verbosity(cli.verbose, cli.quiet));

    let dataset = load_dataset_from_cli(&cli)?;
    let (min, max) = dataset.bounds().ok_or("dataset has no splats")?;
    let target = (min + max) * 0.5;
    let radius = ((max - min).length() * 0.9).max(1.0);

    let config = ViewerConfig {
        index: IndexConfig {
            max_depth: cli.max_depth,
            split_threshold: cli.split_threshold,
        },
        blend_order: if cli.front_to_back {
            BlendOrder::FrontToBack
        } else {
            BlendOrder::BackToFront
        },
    };
    let mut viewer = SplatViewer::new(dataset, config)?;

    let mut camera = Camera::new(target + Vec3::new(0.0, radius * 0.2, radius), 0.0, 0.0);
    look_at_target(&mut camera, target);
    let mut orbit_state = OrbitState {
        target,
        angle: 0.0,
        radius,
        height: radius * 0.2,
    };
    let options = LoopOptions {
        frames: cli.frames,
        fixed_delta: cli.fixed_step.then_some(1.0 / 60.0),
        log_every: 120,
    };

    let result = run_frame_loop(&mut viewer, &mut camera, &mut orbit_state, options, || {
        surface_size(&cli)
    });
    let index = viewer.index();
    tracing::info!(
        nodes = index.node_count(),
        leaves = index.count_leaves(),
        depth = index.depth(),
        max_leaf = index.max_leaf_vertex_count(),
        "index"
    );
    viewer.shutdown();
    let summary = result?;

    tracing::info!(
        frames = summary.frames,
        dispatched = summary.dispatched,
        completed = summary.completed,
        failed = summary.failed,
        uploads = summary.uploads,
        fps = summary.fps,
        "done"
    );
    Ok(())
}
