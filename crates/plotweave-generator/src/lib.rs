pub mod foreign;
pub mod hooks;
pub mod registry;
pub mod wrapper;

pub use foreign::{FlatGenerator, ForeignError, ForeignGenerator};
pub use hooks::{ChunkCache, ChunkHooks, NoHooks};
pub use registry::{AreaRegistry, MemoryAreaRegistry, MemoryMergeStore, MergeStore};
pub use wrapper::{ChunkOutcome, GeneratorMode, GeneratorState, PlotGenerator};
