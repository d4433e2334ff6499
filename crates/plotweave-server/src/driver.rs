use crate::config::{ModeSpec, ServerConfig};
use futures::future::join_all;
use plotweave_common::{PlotError, Result};
use plotweave_generator::{
    ChunkOutcome, FlatGenerator, MemoryAreaRegistry, MemoryMergeStore,
    PlotGenerator,
};
use plotweave_logger::log;
use plotweave_logger::LogSeverity::{Debug, Error, Info};
use plotweave_world::{ChunkSink, ColumnBuffer, QueueRegistry};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{interval, Duration};

/// Sink that only counts what it receives
#[derive(Debug, Default)]
pub struct SummarySink {
    chunks: AtomicUsize,
    blocks: AtomicUsize,
    bytes: AtomicUsize,
}

impl SummarySink {
    pub fn chunks(&self) -> usize {
        self.chunks.load(Ordering::SeqCst)
    }

    pub fn blocks(&self) -> usize {
        self.blocks.load(Ordering::SeqCst)
    }

    pub fn bytes(&self) -> usize {
        self.bytes.load(Ordering::SeqCst)
    }
}

impl ChunkSink for SummarySink {
    fn commit(&self, _world: &str, chunk: ColumnBuffer) -> Result<()> {
        let encoded = chunk.serialize()?;
        self.chunks.fetch_add(1, Ordering::SeqCst);
        self.blocks.fetch_add(chunk.non_air_blocks(), Ordering::SeqCst);
        self.bytes.fetch_add(encoded.len(), Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldSummary {
    pub world: String,
    pub generated: usize,
    pub fallback: usize,
    pub skipped: usize,
    pub void: usize,
    /// Columns written by the layout over every chunk
    pub columns: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub worlds: Vec<WorldSummary>,
    /// Chunks the sink accepted, periodic and final flushes together
    pub committed: usize,
}

impl WorldSummary {
    fn record(&mut self, outcome: ChunkOutcome) {
        match outcome {
            ChunkOutcome::Generated { columns } => {
                self.generated += 1;
                self.columns += columns;
            }
            ChunkOutcome::Fallback { columns } => {
                self.fallback += 1;
                self.columns += columns;
            }
            ChunkOutcome::Skipped => self.skipped += 1,
            ChunkOutcome::Void => self.void += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.generated + self.fallback + self.skipped + self.void
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Committed {} chunk(s)", self.committed)?;
        for world in &self.worlds {
            write!(
                f,
                "; {}: {} generated, {} fallback, {} skipped, {} void",
                world.world, world.generated, world.fallback, world.skipped, world.void
            )?;
        }
        Ok(())
    }
}

fn flush_all(queues: &QueueRegistry, sink: &dyn ChunkSink) -> Result<usize> {
    let mut committed = 0;
    for world in queues.worlds() {
        committed += queues.get_queue(&world).flush(sink)?;
    }
    Ok(committed)
}

/// Flushes on the blocking pool, sinks may do file or network IO
async fn flush_blocking(queues: &Arc<QueueRegistry>, sink: &Arc<dyn ChunkSink>) -> Result<usize> {
    let queues = Arc::clone(queues);
    let sink = Arc::clone(sink);
    tokio::task::spawn_blocking(move || flush_all(&queues, sink.as_ref()))
        .await
        .map_err(|err| PlotError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string())))?
}

fn build_generators(
    config: &ServerConfig,
    queues: &Arc<QueueRegistry>,
) -> Result<Vec<(String, Arc<PlotGenerator>)>> {
    let areas = Arc::new(MemoryAreaRegistry::new());
    let merges = Arc::new(MemoryMergeStore::new());
    let mut generators = Vec::new();
    for (world, spec) in &config.worlds {
        let area = spec.build_area(world)?;
        let biome = area.biome();
        areas.insert(area);
        let generator = match spec.mode {
            ModeSpec::Replacing => {
                PlotGenerator::replacing(areas.clone(), merges.clone(), Arc::clone(queues))
            }
            ModeSpec::Augmenting => {
                let flat = FlatGenerator::new(spec.foreign_height, biome);
                PlotGenerator::augmenting(
                    Arc::new(flat),
                    areas.clone(),
                    merges.clone(),
                    Arc::clone(queues),
                )
            }
        };
        generators.push((world.clone(), Arc::new(generator)));
    }
    Ok(generators)
}

async fn generate_world(
    world: String,
    radius: i32,
    generator: Arc<PlotGenerator>,
) -> Result<WorldSummary> {
    let tasks = (-radius..=radius).flat_map(|chunk_x| {
        let world = world.clone();
        let generator = Arc::clone(&generator);
        (-radius..=radius).map(move |chunk_z| {
            let world = world.clone();
            let generator = Arc::clone(&generator);
            tokio::task::spawn_blocking(move || generator.generate_chunk(&world, chunk_x, chunk_z))
        })
    });

    let mut summary = WorldSummary {
        world: world.clone(),
        ..WorldSummary::default()
    };
    for joined in join_all(tasks).await {
        let outcome = joined.map_err(|err| {
            PlotError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
        })??;
        summary.record(outcome);
    }

    let state = generator.state(&world);
    let spawn = generator.can_spawn_at(&world, 0, 0);
    log(
        format!(
            "World {} is {:?}, spawn at (0, {:?}, 0) is {}",
            world,
            state,
            generator.spawn_height(&world),
            if spawn { "safe" } else { "blocked" }
        ),
        Info,
    );
    Ok(summary)
}

/// Generates every configured world and commits the chunks to `sink`.
///
/// Queues are flushed on a fixed tick while generation runs and once more
/// at the end. A failing periodic flush is logged and retried by the next
/// one, a failing final flush is returned.
pub async fn run(config: ServerConfig, sink: Arc<dyn ChunkSink>) -> Result<RunSummary> {
    let queues = Arc::new(QueueRegistry::new());
    let generators = build_generators(&config, &queues)?;
    log(format!("Generating {} world(s)", generators.len()), Info);

    let (stop_flusher, mut stopped) = oneshot::channel::<()>();
    let flusher = {
        let queues = Arc::clone(&queues);
        let sink = Arc::clone(&sink);
        let period = Duration::from_millis(config.flush_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = interval(period);
            let mut committed = 0;
            loop {
                tokio::select! {
                    _ = ticker.tick() => match flush_blocking(&queues, &sink).await {
                        Ok(count) => committed += count,
                        Err(err) => log(format!("Periodic flush failed: {}", err), Error),
                    },
                    _ = &mut stopped => break,
                }
            }
            committed
        })
    };

    let runs = generators.into_iter().map(|(world, generator)| {
        let radius = config.worlds.get(&world).map_or(0, |spec| spec.radius);
        let queue = queues.get_queue(&world);
        async move {
            let summary = generate_world(world.clone(), radius, generator).await?;
            queue.add_completion(move || {
                log(format!("All chunks of {} committed", world), Debug);
            });
            Ok::<_, PlotError>(summary)
        }
    });
    let results = join_all(runs).await;

    // The receiver only goes away once the flusher has stopped
    let _ = stop_flusher.send(());
    let mut committed = flusher.await.map_err(|err| {
        PlotError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
    })?;

    let worlds = results.into_iter().collect::<Result<Vec<_>>>()?;
    committed += flush_blocking(&queues, &sink).await?;

    let summary = RunSummary { worlds, committed };
    log(summary.to_string(), Info);
    Ok(summary)
}
