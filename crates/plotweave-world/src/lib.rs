pub mod area;
pub mod block;
pub mod chunk;
pub mod layout;
pub mod materialize;
pub mod merge;
pub mod queue;

pub use area::{AreaConfig, PlotArea, TerrainMode};
pub use block::{BlockBucket, BlockState};
pub use chunk::{ChunkWriter, ColumnBuffer};
pub use layout::{classify, Classification, WallSegment};
pub use materialize::{materialize, materialize_into, Fill};
pub use merge::{classify_merged, is_wall_suppressed, MergeLookup, MergeState, NoMerges};
pub use queue::{BlockQueue, ChunkSink, QueueRegistry, ScopedChunk};
