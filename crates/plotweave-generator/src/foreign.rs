use plotweave_common::ChunkCoord;
use plotweave_world::chunk::WORLD_HEIGHT;
use plotweave_world::{BlockState, ChunkWriter, ColumnBuffer};
use std::error::Error;

pub type ForeignError = Box<dyn Error + Send + Sync>;

/// A terrain generator this crate does not control, wrapped in augmenting mode.
pub trait ForeignGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, world: &str, coord: ChunkCoord) -> Result<ColumnBuffer, ForeignError>;

    fn can_spawn_at(&self, _world: &str, _x: i32, _z: i32) -> bool {
        true
    }

    fn generates_structures(&self) -> bool {
        false
    }

    fn generates_decorations(&self) -> bool {
        false
    }
}

/// Layered flat terrain: bedrock, stone, dirt and a grass top
pub struct FlatGenerator {
    height: i32,
    biome: i32,
}

impl FlatGenerator {
    pub fn new(height: i32, biome: i32) -> Self {
        FlatGenerator {
            height: height.clamp(1, WORLD_HEIGHT - 1),
            biome,
        }
    }

    pub fn height(&self) -> i32 {
        self.height
    }
}

impl ForeignGenerator for FlatGenerator {
    fn name(&self) -> &str {
        "flat"
    }

    fn generate(&self, _world: &str, coord: ChunkCoord) -> Result<ColumnBuffer, ForeignError> {
        let mut chunk = ColumnBuffer::new(coord);
        for x in 0..16 {
            for z in 0..16 {
                chunk.set_block(x, 0, z, BlockState::BEDROCK)?;
                for y in 1..self.height {
                    let block = if y >= self.height - 3 {
                        BlockState::DIRT
                    } else {
                        BlockState::STONE
                    };
                    chunk.set_block(x, y, z, block)?;
                }
                chunk.set_block(x, self.height, z, BlockState::GRASS_BLOCK)?;
                chunk.set_biome(x, z, self.biome)?;
            }
        }
        Ok(chunk)
    }

    fn generates_decorations(&self) -> bool {
        true
    }
}
