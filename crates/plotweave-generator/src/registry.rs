use plotweave_common::{ChunkCoord, PlotId};
use plotweave_logger::log;
use plotweave_logger::LogSeverity::Info;
use plotweave_world::layout::axis_bands;
use plotweave_world::layout::AxisBand;
use plotweave_world::{MergeState, PlotArea};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

/// Where plot areas are looked up by world name.
pub trait AreaRegistry: Send + Sync {
    fn lookup(&self, world: &str) -> Option<Arc<PlotArea>>;

    /// Called once per world by the generator that serves it
    fn register_world_once(&self, world: &str, generator: &str);
}

/// Read access to persisted merge states.
pub trait MergeStore: Send + Sync {
    fn get_merge_state(&self, id: PlotId) -> MergeState;

    fn get_merge_states(&self, ids: &[PlotId]) -> HashMap<PlotId, MergeState> {
        ids.iter()
            .map(|id| (*id, self.get_merge_state(*id)))
            .filter(|(_, state)| state.any())
            .collect()
    }
}

/// Plot ids whose merge state can affect the columns of a chunk
pub fn plots_near_chunk(area: &PlotArea, coord: ChunkCoord) -> Vec<PlotId> {
    let cell = |band: AxisBand| match band {
        AxisBand::Plot(cell) | AxisBand::Gap(cell, _) => cell,
    };
    let (min_x, min_z) = axis_bands(area, coord.min_block_x(), coord.min_block_z());
    let (max_x, max_z) = axis_bands(area, coord.min_block_x() + 15, coord.min_block_z() + 15);
    let mut ids = Vec::new();
    for x in cell(min_x)..=cell(max_x) + 1 {
        for z in cell(min_z)..=cell(max_z) + 1 {
            ids.push(PlotId::new(x, z));
        }
    }
    ids
}

#[derive(Default)]
pub struct MemoryAreaRegistry {
    areas: RwLock<HashMap<String, Arc<PlotArea>>>,
    registered: RwLock<HashMap<String, String>>,
}

impl MemoryAreaRegistry {
    pub fn new() -> Self {
        MemoryAreaRegistry::default()
    }

    pub fn insert(&self, area: PlotArea) {
        self.areas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(area.world().to_owned(), Arc::new(area));
    }

    /// Generator name a world was registered with
    pub fn generator_of(&self, world: &str) -> Option<String> {
        self.registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(world)
            .cloned()
    }

    pub fn registered_worlds(&self) -> usize {
        self.registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl AreaRegistry for MemoryAreaRegistry {
    fn lookup(&self, world: &str) -> Option<Arc<PlotArea>> {
        self.areas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(world)
            .cloned()
    }

    fn register_world_once(&self, world: &str, generator: &str) {
        let mut registered = self
            .registered
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if registered.contains_key(world) {
            return;
        }
        registered.insert(world.to_owned(), generator.to_owned());
        log(
            format!("Loaded world {} with generator {}", world, generator),
            Info,
        );
    }
}

#[derive(Default)]
pub struct MemoryMergeStore {
    states: RwLock<HashMap<PlotId, MergeState>>,
}

impl MemoryMergeStore {
    pub fn new() -> Self {
        MemoryMergeStore::default()
    }

    /// Merges two adjacent plots, setting the flag on both sides
    pub fn merge(&self, a: PlotId, b: PlotId) -> bool {
        let Some(direction) = plotweave_common::Direction::ALL
            .into_iter()
            .find(|direction| a.neighbor(*direction) == b)
        else {
            return false;
        };
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        let state_a = states.get(&a).copied().unwrap_or_default().with(direction);
        let state_b = states
            .get(&b)
            .copied()
            .unwrap_or_default()
            .with(direction.opposite());
        states.insert(a, state_a);
        states.insert(b, state_b);
        true
    }

    pub fn set(&self, id: PlotId, state: MergeState) {
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, state);
    }

    pub fn touched_plots(&self) -> HashSet<PlotId> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}

impl MergeStore for MemoryMergeStore {
    fn get_merge_state(&self, id: PlotId) -> MergeState {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotweave_common::Direction;
    use plotweave_world::AreaConfig;

    #[test]
    fn test_register_world_once_keeps_first_generator() {
        let registry = MemoryAreaRegistry::new();
        registry.register_world_once("plotworld", "plotweave");
        registry.register_world_once("plotworld", "other");
        assert_eq!(registry.generator_of("plotworld").as_deref(), Some("plotweave"));
        assert_eq!(registry.registered_worlds(), 1);
    }

    #[test]
    fn test_lookup_by_world() {
        let registry = MemoryAreaRegistry::new();
        registry.insert(PlotArea::new("plotworld", AreaConfig::default()).unwrap());
        assert!(registry.lookup("plotworld").is_some());
        assert!(registry.lookup("nether").is_none());
    }

    #[test]
    fn test_merge_sets_both_sides() {
        let store = MemoryMergeStore::new();
        assert!(store.merge(PlotId::new(0, 0), PlotId::new(0, 1)));
        assert!(!store.merge(PlotId::new(0, 0), PlotId::new(2, 2)));
        assert!(store
            .get_merge_state(PlotId::new(0, 0))
            .is_merged(Direction::South));
        assert!(store
            .get_merge_state(PlotId::new(0, 1))
            .is_merged(Direction::North));
        assert_eq!(store.touched_plots().len(), 2);
    }

    #[test]
    fn test_batch_lookup_skips_unmerged() {
        let store = MemoryMergeStore::new();
        store.merge(PlotId::new(0, 0), PlotId::new(1, 0));
        let states = store.get_merge_states(&[
            PlotId::new(0, 0),
            PlotId::new(1, 0),
            PlotId::new(5, 5),
        ]);
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn test_plots_near_chunk_cover_neighbors() {
        let area = PlotArea::new("plotworld", AreaConfig::default()).unwrap();
        let ids = plots_near_chunk(&area, ChunkCoord::new(0, 0));
        // Chunk (0,0) touches the gap before plot (0,0) and its body
        assert!(ids.contains(&PlotId::new(-1, -1)));
        assert!(ids.contains(&PlotId::new(0, 0)));
        assert!(ids.contains(&PlotId::new(1, 1)));
    }
}
