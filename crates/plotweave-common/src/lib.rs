pub mod error;
pub mod types;

pub use error::PlotError;
pub use types::{ChunkCoord, Direction, PlotId, Result};
