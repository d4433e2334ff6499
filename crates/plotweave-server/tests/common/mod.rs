use plotweave_common::{ChunkCoord, PlotError, Result};
use plotweave_server::{ModeSpec, ServerConfig, WorldSpec};
use plotweave_world::{AreaConfig, ChunkSink, ColumnBuffer};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Sink keeping every committed chunk
#[derive(Default)]
pub struct RecordingSink {
    pub chunks: Mutex<Vec<(String, ColumnBuffer)>>,
}

impl RecordingSink {
    pub fn coords(&self, world: &str) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == world)
            .map(|(_, chunk)| chunk.coord())
            .collect();
        coords.sort();
        coords
    }

    pub fn chunk(&self, world: &str, coord: ChunkCoord) -> Option<ColumnBuffer> {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .find(|(name, chunk)| name == world && chunk.coord() == coord)
            .map(|(_, chunk)| chunk.clone())
    }
}

impl ChunkSink for RecordingSink {
    fn commit(&self, world: &str, chunk: ColumnBuffer) -> Result<()> {
        self.chunks.lock().unwrap().push((world.to_owned(), chunk));
        Ok(())
    }
}

/// Sink rejecting everything
pub struct BrokenSink;

impl ChunkSink for BrokenSink {
    fn commit(&self, _world: &str, _chunk: ColumnBuffer) -> Result<()> {
        Err(PlotError::SinkError("storage offline".to_owned()))
    }
}

pub fn world(mode: ModeSpec, radius: i32) -> WorldSpec {
    WorldSpec {
        area: AreaConfig::default(),
        mode,
        radius,
        ..WorldSpec::default()
    }
}

pub fn config(worlds: Vec<(&str, WorldSpec)>) -> ServerConfig {
    ServerConfig {
        flush_interval_ms: 5,
        worlds: worlds
            .into_iter()
            .map(|(name, spec)| (name.to_owned(), spec))
            .collect::<BTreeMap<_, _>>(),
    }
}
