//! Octree-partitioned Gaussian splat scenes with an asynchronous,
//! single-flight, view-dependent depth sort.
//!
//! A [`viewer::SplatViewer`] builds a [`octree::SpatialIndex`] over a
//! [`splat::SplatDataset`], keeps one [`leaf::LeafRenderState`] per non-empty
//! leaf and, once per frame, hands the most urgent leaf to a background sort
//! thread. Sorted attributes come back through a reused buffer pair that moves
//! between the two threads with each message.

pub mod camera;
pub mod config;
pub mod demo;
pub mod error;
pub mod frame;
pub mod leaf;
pub mod logging;
pub mod octree;
pub mod parser;
pub mod scheduler;
pub mod sort;
pub mod splat;
pub mod transfer;
pub mod viewer;
pub mod worker;

pub use config::{BlendOrder, IndexConfig, ViewerConfig};
pub use error::{BuildError, DispatchError, LoadError, SortJobError, ViewerError};
pub use viewer::{FrameStats, SplatViewer};
