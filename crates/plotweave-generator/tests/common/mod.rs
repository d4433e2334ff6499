use plotweave_common::{ChunkCoord, PlotId};
use plotweave_generator::{
    ForeignError, ForeignGenerator, MemoryAreaRegistry, MemoryMergeStore, PlotGenerator,
};
use plotweave_world::layout::cell_origin;
use plotweave_world::{AreaConfig, BlockState, ChunkWriter, ColumnBuffer, PlotArea, QueueRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const WORLD: &str = "plotworld";

pub struct Fixture {
    pub areas: Arc<MemoryAreaRegistry>,
    pub merges: Arc<MemoryMergeStore>,
    pub queues: Arc<QueueRegistry>,
}

pub fn fixture(config: AreaConfig) -> Fixture {
    let areas = Arc::new(MemoryAreaRegistry::new());
    areas.insert(PlotArea::new(WORLD, config).unwrap());
    Fixture {
        areas,
        merges: Arc::new(MemoryMergeStore::new()),
        queues: Arc::new(QueueRegistry::new()),
    }
}

impl Fixture {
    pub fn replacing(&self) -> PlotGenerator {
        PlotGenerator::replacing(
            self.areas.clone(),
            self.merges.clone(),
            self.queues.clone(),
        )
    }

    pub fn augmenting(&self, foreign: Arc<dyn ForeignGenerator>) -> PlotGenerator {
        PlotGenerator::augmenting(
            foreign,
            self.areas.clone(),
            self.merges.clone(),
            self.queues.clone(),
        )
    }

    pub fn take(&self, coord: ChunkCoord) -> ColumnBuffer {
        self.queues
            .get_queue(WORLD)
            .take(coord.x, coord.z)
            .expect("chunk was not queued")
    }
}

/// Chunk and local column of a world column
pub fn locate(x: i32, z: i32) -> (ChunkCoord, i32, i32) {
    let coord = ChunkCoord::containing(x, z);
    (coord, x - coord.min_block_x(), z - coord.min_block_z())
}

/// World column at an offset from the first gap column of a cell
pub fn cell_local(config: &AreaConfig, id: PlotId, dx: i32, dz: i32) -> (i32, i32) {
    let area = PlotArea::new(WORLD, config.clone()).unwrap();
    let (x, z) = cell_origin(&area, id);
    (x + dx, z + dz)
}

/// Foreign generator that panics on every chunk
pub struct PanickingGenerator;

impl ForeignGenerator for PanickingGenerator {
    fn name(&self) -> &str {
        "panicking"
    }

    fn generate(&self, _world: &str, _coord: ChunkCoord) -> Result<ColumnBuffer, ForeignError> {
        panic!("terrain noise exploded")
    }
}

/// Foreign generator that fails every chunk and counts the attempts
#[derive(Default)]
pub struct FailingGenerator {
    pub calls: AtomicUsize,
}

impl ForeignGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    fn generate(&self, _world: &str, _coord: ChunkCoord) -> Result<ColumnBuffer, ForeignError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("region file locked".into())
    }
}

/// Foreign generator that places a stone layer on its first chunk and fails afterwards
#[derive(Default)]
pub struct FlakyGenerator {
    pub calls: AtomicUsize,
}

impl ForeignGenerator for FlakyGenerator {
    fn name(&self) -> &str {
        "flaky"
    }

    fn generate(&self, _world: &str, coord: ChunkCoord) -> Result<ColumnBuffer, ForeignError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err("noise cache evicted".into());
        }
        let mut chunk = ColumnBuffer::new(coord);
        for x in 0..16 {
            for z in 0..16 {
                chunk.set_block(x, 100, z, BlockState::STONE)?;
            }
        }
        Ok(chunk)
    }
}
