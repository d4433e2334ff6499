use crate::foreign::ForeignGenerator;
use crate::hooks::{ChunkHooks, NoHooks};
use crate::registry::{plots_near_chunk, AreaRegistry, MergeStore};
use plotweave_common::{ChunkCoord, PlotError, PlotId, Result};
use plotweave_logger::log;
use plotweave_logger::LogSeverity::{Debug, Error, Warning};
use plotweave_world::layout::is_claimed;
use plotweave_world::{
    classify_merged, materialize_into, Classification, ColumnBuffer, Fill, MergeState, PlotArea,
    QueueRegistry,
};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

/// How a generator produces terrain, fixed at construction.
#[derive(Clone)]
pub enum GeneratorMode {
    /// The layout is the only terrain source
    Replacing,
    /// The layout is written over the output of a foreign generator
    Augmenting(Arc<dyn ForeignGenerator>),
}

/// Per world state as seen by one generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// No chunk of the world was requested yet
    Uninitialized,
    Replacing,
    Augmenting,
}

/// What a chunk request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// A pre-process hook handled the chunk
    Skipped,
    /// The layout was written, `columns` of them owned by the area
    Generated { columns: usize },
    /// The world has no area, the chunk is left empty
    Void,
    /// The foreign generator failed, only the layout was written
    Fallback { columns: usize },
}

/// Entry point of chunk generation for plot worlds.
///
/// Output goes into the block queue of the requested world, which the host
/// flushes on its own schedule.
pub struct PlotGenerator {
    name: String,
    mode: GeneratorMode,
    areas: Arc<dyn AreaRegistry>,
    merges: Arc<dyn MergeStore>,
    hooks: Arc<dyn ChunkHooks>,
    queues: Arc<QueueRegistry>,
    loaded: Mutex<HashSet<String>>,
}

impl PlotGenerator {
    pub fn new(
        name: impl Into<String>,
        mode: GeneratorMode,
        areas: Arc<dyn AreaRegistry>,
        merges: Arc<dyn MergeStore>,
        queues: Arc<QueueRegistry>,
    ) -> Self {
        PlotGenerator {
            name: name.into(),
            mode,
            areas,
            merges,
            hooks: Arc::new(NoHooks),
            queues,
            loaded: Mutex::new(HashSet::new()),
        }
    }

    pub fn replacing(
        areas: Arc<dyn AreaRegistry>,
        merges: Arc<dyn MergeStore>,
        queues: Arc<QueueRegistry>,
    ) -> Self {
        PlotGenerator::new("plotweave", GeneratorMode::Replacing, areas, merges, queues)
    }

    pub fn augmenting(
        foreign: Arc<dyn ForeignGenerator>,
        areas: Arc<dyn AreaRegistry>,
        merges: Arc<dyn MergeStore>,
        queues: Arc<QueueRegistry>,
    ) -> Self {
        let name = format!("plotweave+{}", foreign.name());
        PlotGenerator::new(name, GeneratorMode::Augmenting(foreign), areas, merges, queues)
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ChunkHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> &GeneratorMode {
        &self.mode
    }

    pub fn queues(&self) -> &Arc<QueueRegistry> {
        &self.queues
    }

    pub fn state(&self, world: &str) -> GeneratorState {
        let loaded = self
            .loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(world);
        match (&self.mode, loaded) {
            (_, false) => GeneratorState::Uninitialized,
            (GeneratorMode::Replacing, true) => GeneratorState::Replacing,
            (GeneratorMode::Augmenting(_), true) => GeneratorState::Augmenting,
        }
    }

    fn load_world(&self, world: &str) {
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if loaded.insert(world.to_owned()) {
            self.areas.register_world_once(world, &self.name);
        }
    }

    /// Generates one chunk into the world's block queue.
    ///
    /// Foreign generator failures and worlds without an area never produce an
    /// error here. Errors only come from writes the layout itself makes.
    pub fn generate_chunk(&self, world: &str, chunk_x: i32, chunk_z: i32) -> Result<ChunkOutcome> {
        self.load_world(world);
        let coord = ChunkCoord::new(chunk_x, chunk_z);
        let queue = self.queues.get_queue(world);

        let Some(area) = self.areas.lookup(world) else {
            log(
                format!("No plot area for world {}, chunk {} stays empty", world, coord),
                Warning,
            );
            queue.with_chunk(chunk_x, chunk_z, |chunk| *chunk = ColumnBuffer::new(coord));
            return Ok(ChunkOutcome::Void);
        };
        let merges = self.prefetch_merges(&area, coord);

        // Every request starts from an empty buffer, whatever an earlier request left queued
        match &self.mode {
            GeneratorMode::Replacing => queue.with_chunk(chunk_x, chunk_z, |chunk| -> Result<_> {
                *chunk = ColumnBuffer::new(coord);
                if self.hooks.pre_process_chunk(world, chunk) {
                    return Ok(ChunkOutcome::Skipped);
                }
                let columns = materialize_into(&area, coord, &merges, chunk, Fill::Fresh)?;
                self.hooks.post_process_chunk(world, chunk);
                Ok(ChunkOutcome::Generated { columns })
            }),
            GeneratorMode::Augmenting(foreign) => {
                let raw = run_foreign(foreign.as_ref(), world, coord);
                let failed = raw.is_none();
                queue.with_chunk(chunk_x, chunk_z, move |chunk| -> Result<_> {
                    *chunk = raw.unwrap_or_else(|| ColumnBuffer::new(coord));
                    let columns = materialize_into(&area, coord, &merges, chunk, Fill::Overwrite)?;
                    self.hooks.post_process_chunk(world, chunk);
                    Ok(if failed {
                        ChunkOutcome::Fallback { columns }
                    } else {
                        ChunkOutcome::Generated { columns }
                    })
                })
            }
        }
    }

    /// Merge states of every plot the chunk can touch, read once per chunk
    fn prefetch_merges(&self, area: &PlotArea, coord: ChunkCoord) -> HashMap<PlotId, MergeState> {
        self.merges.get_merge_states(&plots_near_chunk(area, coord))
    }

    pub fn can_spawn_at(&self, world: &str, x: i32, z: i32) -> bool {
        let Some(area) = self.areas.lookup(world) else {
            return false;
        };
        if let GeneratorMode::Augmenting(foreign) = &self.mode {
            if !is_claimed(&area, x, z) {
                return foreign.can_spawn_at(world, x, z);
            }
        }
        let merges = self.prefetch_merges(&area, ChunkCoord::containing(x, z));
        match classify_merged(&area, &merges, x, z) {
            Classification::Plot(_) | Classification::Road => true,
            Classification::Wall(..) => false,
        }
    }

    /// Height a player is placed at when spawning on plot ground
    pub fn spawn_height(&self, world: &str) -> Option<i32> {
        self.areas.lookup(world).map(|area| area.plot_height() + 1)
    }

    pub fn generates_structures(&self) -> bool {
        match &self.mode {
            GeneratorMode::Replacing => false,
            GeneratorMode::Augmenting(foreign) => foreign.generates_structures(),
        }
    }

    pub fn generates_decorations(&self) -> bool {
        match &self.mode {
            GeneratorMode::Replacing => false,
            GeneratorMode::Augmenting(foreign) => foreign.generates_decorations(),
        }
    }
}

/// Runs the foreign generator, absorbing errors and panics
fn run_foreign(
    foreign: &dyn ForeignGenerator,
    world: &str,
    coord: ChunkCoord,
) -> Option<ColumnBuffer> {
    match panic::catch_unwind(AssertUnwindSafe(|| foreign.generate(world, coord))) {
        Ok(Ok(raw)) if raw.coord() == coord => {
            log(
                format!("{} generated chunk {} in {}", foreign.name(), coord, world),
                Debug,
            );
            Some(raw)
        }
        Ok(Ok(raw)) => {
            log(
                format!(
                    "{} returned chunk {} for {} in {}, ignoring it",
                    foreign.name(),
                    raw.coord(),
                    coord,
                    world
                ),
                Warning,
            );
            None
        }
        Ok(Err(err)) => {
            let err = PlotError::ForeignGeneratorError(format!(
                "{} failed on chunk {} in {}: {}",
                foreign.name(),
                coord,
                world,
                err
            ));
            log(err.to_string(), Error);
            None
        }
        Err(_) => {
            let err = PlotError::ForeignGeneratorError(format!(
                "{} panicked on chunk {} in {}",
                foreign.name(),
                coord,
                world
            ));
            log(err.to_string(), Error);
            None
        }
    }
}
