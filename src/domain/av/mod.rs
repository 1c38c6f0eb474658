//! Stream-copy remux pipeline: split, merge and plan deliverable parts.

pub mod cmd;
pub mod merge;
pub mod plan;
pub mod split;

pub use cmd::{RealRemuxRunner, RemuxRunner};
pub use merge::ChunkMerger;
pub use plan::{group_by_ceiling, ChunkPlanner};
pub use split::SizeChunker;
