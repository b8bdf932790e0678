use thiserror::Error;

use crate::octree::NodeId;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid .splat file: size {len} is not a multiple of {record_size} bytes")]
    TruncatedRecord { len: usize, record_size: usize },
    #[error("invalid .splat file: no records")]
    Empty,
    #[error("unsupported input '{0}'; use a .splat file or --demo")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("cannot build a spatial index over an empty dataset")]
    EmptyDataset,
    #[error(
        "split threshold must be at least 1 and max depth at most {}",
        crate::config::MAX_SUPPORTED_DEPTH
    )]
    InvalidConfig,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SortJobError {
    #[error("leaf {leaf_id}: vertex count {vertex_count} exceeds transfer capacity {capacity}")]
    CapacityExceeded {
        leaf_id: NodeId,
        vertex_count: usize,
        capacity: usize,
    },
    #[error("leaf {leaf_id}: job claims {vertex_count} splats but carries {indices} indices")]
    VertexCountMismatch {
        leaf_id: NodeId,
        vertex_count: usize,
        indices: usize,
    },
    #[error("leaf {leaf_id}: view transform or camera position is not finite")]
    NonFiniteView { leaf_id: NodeId },
    #[error("leaf {leaf_id}: splat index {index} is outside the dataset")]
    IndexOutOfRange { leaf_id: NodeId, index: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("sort job for leaf {leaf_id} is still in flight")]
    InFlight { leaf_id: NodeId },
    #[error("sort worker has shut down")]
    WorkerDisconnected,
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("failed to spawn sort worker: {0}")]
    Spawn(#[from] std::io::Error),
}
