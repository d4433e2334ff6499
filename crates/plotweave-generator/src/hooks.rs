use plotweave_common::ChunkCoord;
use plotweave_world::ColumnBuffer;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Extension points around chunk generation.
///
/// Both return whether they handled the chunk. A handled pre-process skips
/// the layout pass entirely.
pub trait ChunkHooks: Send + Sync {
    fn pre_process_chunk(&self, _world: &str, _chunk: &mut ColumnBuffer) -> bool {
        false
    }

    fn post_process_chunk(&self, _world: &str, _chunk: &mut ColumnBuffer) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ChunkHooks for NoHooks {}

/// Replays stored chunk content instead of generating it again.
///
/// Entries are consumed on use, so a chunk is replayed once per store.
#[derive(Default)]
pub struct ChunkCache {
    chunks: Mutex<HashMap<(String, ChunkCoord), ColumnBuffer>>,
}

impl ChunkCache {
    pub fn new() -> Self {
        ChunkCache::default()
    }

    pub fn store(&self, world: &str, chunk: ColumnBuffer) {
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((world.to_owned(), chunk.coord()), chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChunkHooks for ChunkCache {
    fn pre_process_chunk(&self, world: &str, chunk: &mut ColumnBuffer) -> bool {
        let cached = self
            .chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(world.to_owned(), chunk.coord()));
        match cached {
            Some(cached) => {
                chunk.overlay(&cached);
                true
            }
            None => false,
        }
    }
}
