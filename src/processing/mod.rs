pub mod merger;
pub mod normalizer;
pub mod tree;

pub use merger::merge;
pub use normalizer::{normalize, normalize_batch, NormalizedBatch};
pub use tree::{build_log_tree, RootTaskGroup, TaskGroup};
