use crate::block::BlockState;
use crate::chunk::{ChunkWriter, ColumnBuffer};
use plotweave_common::{ChunkCoord, Result};
use plotweave_logger::log;
use plotweave_logger::LogSeverity::Debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Host side receiver of finished chunks.
pub trait ChunkSink: Send + Sync {
    fn commit(&self, world: &str, chunk: ColumnBuffer) -> Result<()>;
}

type Completion = Box<dyn FnOnce() + Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pending block and biome writes of one world, grouped per chunk.
///
/// Views for different chunks share nothing but the map lookup, so they can
/// be written from several threads at once. `flush` is expected to run from a
/// single thread per world.
pub struct BlockQueue {
    world: String,
    chunks: RwLock<HashMap<ChunkCoord, Arc<Mutex<ColumnBuffer>>>>,
    completions: Mutex<Vec<Completion>>,
}

/// Write view of one chunk inside a [`BlockQueue`].
///
/// A view keeps pointing at its buffer after a flush committed it, so views
/// are requested again after every flush.
#[derive(Clone)]
pub struct ScopedChunk {
    coord: ChunkCoord,
    buffer: Arc<Mutex<ColumnBuffer>>,
}

impl BlockQueue {
    pub fn new(world: impl Into<String>) -> Self {
        BlockQueue {
            world: world.into(),
            chunks: RwLock::new(HashMap::new()),
            completions: Mutex::new(Vec::new()),
        }
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn for_chunk(&self, chunk_x: i32, chunk_z: i32) -> ScopedChunk {
        let coord = ChunkCoord::new(chunk_x, chunk_z);
        {
            let chunks = self.chunks.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(buffer) = chunks.get(&coord) {
                return ScopedChunk {
                    coord,
                    buffer: Arc::clone(buffer),
                };
            }
        }
        let mut chunks = self.chunks.write().unwrap_or_else(PoisonError::into_inner);
        let buffer = chunks
            .entry(coord)
            .or_insert_with(|| Arc::new(Mutex::new(ColumnBuffer::new(coord))));
        ScopedChunk {
            coord,
            buffer: Arc::clone(buffer),
        }
    }

    /// Runs `f` on the pending buffer of a chunk. No flush can take the
    /// buffer while `f` runs, so the edit is committed as a whole.
    ///
    /// Only the chunk's own buffer is locked during `f`, other chunks stay writable.
    pub fn with_chunk<R>(
        &self,
        chunk_x: i32,
        chunk_z: i32,
        f: impl FnOnce(&mut ColumnBuffer) -> R,
    ) -> R {
        loop {
            let scoped = self.for_chunk(chunk_x, chunk_z);
            let mut buffer = lock(&scoped.buffer);
            // A flush that took the buffer before we locked it would drop the edit
            if self.is_pending(&scoped) {
                return f(&mut buffer);
            }
        }
    }

    fn is_pending(&self, scoped: &ScopedChunk) -> bool {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scoped.coord)
            .is_some_and(|buffer| Arc::ptr_eq(buffer, &scoped.buffer))
    }

    pub fn pending_chunks(&self) -> usize {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Removes a pending chunk without committing it, for hosts that consume buffers directly
    pub fn take(&self, chunk_x: i32, chunk_z: i32) -> Option<ColumnBuffer> {
        let buffer = self
            .chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ChunkCoord::new(chunk_x, chunk_z))?;
        let chunk = lock(&buffer).clone();
        Some(chunk)
    }

    /// Queues a callback that runs after the next successful flush
    pub fn add_completion<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        lock(&self.completions).push(Box::new(callback));
    }

    /// Commits every pending chunk to the sink, then runs queued completions.
    ///
    /// Chunks are committed in coordinate order. If the sink fails the
    /// remaining chunks stay queued and no completion runs.
    pub fn flush(&self, sink: &dyn ChunkSink) -> Result<usize> {
        let pending = {
            let mut chunks = self.chunks.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *chunks)
        };
        let mut pending: Vec<_> = pending.into_iter().collect();
        pending.sort_by_key(|(coord, _)| *coord);

        let mut committed = 0;
        let mut remaining = pending.into_iter();
        while let Some((coord, buffer)) = remaining.next() {
            let chunk = lock(&buffer).clone();
            if let Err(err) = sink.commit(&self.world, chunk) {
                let mut chunks = self.chunks.write().unwrap_or_else(PoisonError::into_inner);
                chunks.entry(coord).or_insert(buffer);
                for (coord, buffer) in remaining {
                    chunks.entry(coord).or_insert(buffer);
                }
                return Err(err);
            }
            committed += 1;
        }

        let completions = std::mem::take(&mut *lock(&self.completions));
        let callbacks = completions.len();
        for completion in completions {
            completion();
        }
        if committed > 0 || callbacks > 0 {
            log(
                format!(
                    "Flushed {} chunk(s) and {} callback(s) for world {}",
                    committed, callbacks, self.world
                ),
                Debug,
            );
        }
        Ok(committed)
    }
}

impl ScopedChunk {
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn set_block(&self, x: i32, y: i32, z: i32, state: BlockState) -> Result<()> {
        lock(&self.buffer).set_block(x, y, z, state)
    }

    pub fn set_biome(&self, x: i32, z: i32, biome: i32) -> Result<()> {
        lock(&self.buffer).set_biome(x, z, biome)
    }

    /// Runs `f` with exclusive access to the chunk buffer, for batched writes
    pub fn edit<R>(&self, f: impl FnOnce(&mut ColumnBuffer) -> R) -> R {
        f(&mut lock(&self.buffer))
    }

    pub fn snapshot(&self) -> ColumnBuffer {
        lock(&self.buffer).clone()
    }
}

/// One [`BlockQueue`] per world
#[derive(Default)]
pub struct QueueRegistry {
    queues: RwLock<HashMap<String, Arc<BlockQueue>>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        QueueRegistry::default()
    }

    pub fn get_queue(&self, world: &str) -> Arc<BlockQueue> {
        if let Some(queue) = self
            .queues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(world)
        {
            return Arc::clone(queue);
        }
        let mut queues = self.queues.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            queues
                .entry(world.to_owned())
                .or_insert_with(|| Arc::new(BlockQueue::new(world))),
        )
    }

    pub fn worlds(&self) -> Vec<String> {
        let mut worlds: Vec<String> = self
            .queues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        worlds.sort();
        worlds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use plotweave_common::PlotError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        committed: Mutex<Vec<(String, ColumnBuffer)>>,
        fail_after: Option<usize>,
    }

    impl ChunkSink for RecordingSink {
        fn commit(&self, world: &str, chunk: ColumnBuffer) -> Result<()> {
            let mut committed = self.committed.lock().unwrap();
            if Some(committed.len()) == self.fail_after {
                return Err(PlotError::SinkError("disk full".to_owned()));
            }
            committed.push((world.to_owned(), chunk));
            Ok(())
        }
    }

    #[test]
    fn test_views_of_same_chunk_share_buffer() {
        let queue = BlockQueue::new("plotworld");
        queue.for_chunk(0, 0).set_block(1, 2, 3, BlockState::STONE).unwrap();
        queue.for_chunk(0, 0).set_block(1, 2, 3, BlockState::DIRT).unwrap();
        queue.for_chunk(1, 0).set_biome(0, 0, 4).unwrap();
        assert_eq!(queue.pending_chunks(), 2);
        assert_eq!(
            queue.for_chunk(0, 0).snapshot().get_block(1, 2, 3),
            Some(BlockState::DIRT)
        );
        assert_eq!(queue.for_chunk(0, 0).snapshot().get_biome(0, 0), None);
    }

    #[test]
    fn test_out_of_chunk_write_is_rejected() {
        let queue = BlockQueue::new("plotworld");
        assert_matches!(
            queue.for_chunk(0, 0).set_block(0, 0, 16, BlockState::STONE),
            Err(PlotError::BufferMisuse { .. })
        );
    }

    #[test]
    fn test_flush_commits_in_order_then_runs_completions() {
        let queue = BlockQueue::new("plotworld");
        let sink = Arc::new(RecordingSink::default());
        for (x, z) in [(2, 0), (-1, 5), (0, 0)] {
            queue.for_chunk(x, z).set_block(0, 0, 0, BlockState::BEDROCK).unwrap();
        }

        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let sink_for_callback = Arc::clone(&sink);
        let seen_in_callback = Arc::clone(&seen);
        queue.add_completion(move || {
            let committed = sink_for_callback.committed.lock().unwrap().len();
            seen_in_callback.store(committed, Ordering::SeqCst);
        });

        assert_eq!(queue.flush(sink.as_ref()).unwrap(), 3);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        let coords: Vec<_> = sink
            .committed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, chunk)| chunk.coord())
            .collect();
        assert_eq!(
            coords,
            vec![
                ChunkCoord::new(-1, 5),
                ChunkCoord::new(0, 0),
                ChunkCoord::new(2, 0)
            ]
        );
        assert_eq!(queue.pending_chunks(), 0);
    }

    #[test]
    fn test_failed_flush_keeps_chunks_and_callbacks() {
        let queue = BlockQueue::new("plotworld");
        let sink = RecordingSink {
            fail_after: Some(1),
            ..RecordingSink::default()
        };
        queue.for_chunk(0, 0);
        queue.for_chunk(1, 0);
        let ran = Arc::new(AtomicBool::new(false));
        let ran_in_callback = Arc::clone(&ran);
        queue.add_completion(move || ran_in_callback.store(true, Ordering::SeqCst));

        assert_matches!(queue.flush(&sink), Err(PlotError::SinkError(_)));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(queue.pending_chunks(), 1);

        let sink = RecordingSink::default();
        assert_eq!(queue.flush(&sink).unwrap(), 1);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_concurrent_views_on_different_chunks() {
        let queue = Arc::new(BlockQueue::new("plotworld"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let view = queue.for_chunk(i, -i);
                    for x in 0..16 {
                        view.set_block(x, i, 0, BlockState::STONE).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.pending_chunks(), 8);
        let chunk = queue.take(3, -3).unwrap();
        assert_eq!(chunk.non_air_blocks(), 16);
        assert_eq!(chunk.get_block(15, 3, 0), Some(BlockState::STONE));
    }

    #[test]
    fn test_with_chunk_recreates_flushed_chunk() {
        let queue = BlockQueue::new("plotworld");
        let sink = RecordingSink::default();
        queue.with_chunk(4, 4, |chunk| chunk.set_block(0, 1, 0, BlockState::STONE)).unwrap();
        assert_eq!(queue.flush(&sink).unwrap(), 1);
        let blocks = queue.with_chunk(4, 4, |chunk| chunk.non_air_blocks());
        assert_eq!(blocks, 0);
        assert_eq!(queue.pending_chunks(), 1);
    }

    #[test]
    fn test_with_chunk_leaves_other_chunks_writable() {
        let queue = BlockQueue::new("plotworld");
        let sink = RecordingSink::default();
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        std::thread::scope(|scope| {
            let queue = &queue;
            let editor = scope.spawn(move || {
                queue.with_chunk(0, 0, |chunk| {
                    chunk.set_block(0, 1, 0, BlockState::STONE).unwrap();
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    chunk.set_block(15, 1, 15, BlockState::DIRT).unwrap();
                })
            });
            started_rx.recv().unwrap();

            // New chunks can be queued while another chunk is being edited
            queue.for_chunk(3, 3).set_block(0, 0, 0, BlockState::BEDROCK).unwrap();
            assert_eq!(queue.pending_chunks(), 2);

            let sink = &sink;
            let flusher = scope.spawn(move || queue.flush(sink).unwrap());
            release_tx.send(()).unwrap();
            editor.join().unwrap();
            assert_eq!(flusher.join().unwrap(), 2);
        });

        let committed = sink.committed.lock().unwrap();
        let (_, edited) = committed
            .iter()
            .find(|(_, chunk)| chunk.coord() == ChunkCoord::new(0, 0))
            .unwrap();
        assert_eq!(edited.get_block(0, 1, 0), Some(BlockState::STONE));
        assert_eq!(edited.get_block(15, 1, 15), Some(BlockState::DIRT));
    }

    #[test]
    fn test_registry_returns_one_queue_per_world() {
        let registry = QueueRegistry::new();
        let a = registry.get_queue("a");
        let again = registry.get_queue("a");
        registry.get_queue("b");
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(registry.worlds(), vec!["a".to_owned(), "b".to_owned()]);
    }
}
