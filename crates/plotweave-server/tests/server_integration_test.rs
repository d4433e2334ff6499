mod common;

use assert_matches::assert_matches;
use common::*;
use futures::future::join_all;
use plotweave_common::{ChunkCoord, PlotError};
use plotweave_server::{run, ModeSpec, ServerConfig, SummarySink};
use plotweave_world::BlockState;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_run_generates_square_per_world() {
    let sink = Arc::new(RecordingSink::default());
    let config = config(vec![
        ("alpha", world(ModeSpec::Replacing, 1)),
        ("beta", world(ModeSpec::Replacing, 2)),
    ]);

    let summary = run(config, sink.clone()).await.unwrap();
    assert_eq!(summary.committed, 9 + 25);
    assert_eq!(summary.worlds.len(), 2);
    assert_eq!(summary.worlds[0].world, "alpha");
    assert_eq!(summary.worlds[0].generated, 9);
    assert_eq!(summary.worlds[1].generated, 25);

    let coords = sink.coords("alpha");
    assert_eq!(coords.len(), 9);
    assert_eq!(coords.first(), Some(&ChunkCoord::new(-1, -1)));
    assert_eq!(coords.last(), Some(&ChunkCoord::new(1, 1)));
}

#[tokio::test]
async fn test_augmenting_world_lays_plots_over_flat_terrain() {
    let sink = Arc::new(RecordingSink::default());
    let mut spec = world(ModeSpec::Augmenting, 0);
    spec.foreign_height = 30;
    spec.modifiers = vec!["terrain=partial".to_owned()];

    let summary = run(config(vec![("overlay", spec)]), sink.clone())
        .await
        .unwrap();
    assert_eq!(summary.worlds[0].generated, 1);

    // Chunk (0,0) starts in the road before plot (0,0)
    let chunk = sink.chunk("overlay", ChunkCoord::new(0, 0)).unwrap();
    assert_eq!(chunk.get_block(0, 30, 8), Some(BlockState::GRASS_BLOCK));
    assert_eq!(chunk.get_block(0, 64, 8), Some(BlockState::AIR));
    assert_eq!(chunk.get_block(10, 64, 10), Some(BlockState::GRASS_BLOCK));
    assert_eq!(chunk.get_block(10, 30, 10), Some(BlockState::DIRT));
}

#[tokio::test]
async fn test_broken_sink_fails_the_run() {
    let result = run(
        config(vec![("alpha", world(ModeSpec::Replacing, 0))]),
        Arc::new(BrokenSink),
    )
    .await;
    assert_matches!(result, Err(PlotError::SinkError(_)));
}

#[tokio::test]
async fn test_invalid_world_fails_before_generating() {
    let mut spec = world(ModeSpec::Replacing, 1);
    spec.area.plot_size = 0;
    let sink = Arc::new(RecordingSink::default());
    let result = run(config(vec![("alpha", spec)]), sink.clone()).await;
    assert_matches!(result, Err(PlotError::ConfigurationError(_)));
    assert!(sink.coords("alpha").is_empty());
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let sinks: Vec<_> = (0..3).map(|_| Arc::new(SummarySink::default())).collect();
    let runs = sinks.iter().enumerate().map(|(i, sink)| {
        let config = config(vec![("plots", world(ModeSpec::Replacing, i as i32))]);
        run(config, sink.clone())
    });

    let results = join_all(runs).await;
    for (i, result) in results.into_iter().enumerate() {
        let side = 2 * i + 1;
        assert_eq!(result.unwrap().committed, side * side);
        assert_eq!(sinks[i].chunks(), side * side);
    }
}

#[tokio::test]
async fn test_run_from_config_file() {
    let path = std::env::temp_dir().join(format!("plotweave-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{ "flush_interval_ms": 10, "worlds": { "plotworld": { "radius": 1, "modifiers": ["s=20", "g=4"] } } }"#,
    )
    .unwrap();
    let config = assert_ok!(ServerConfig::load(&path));
    std::fs::remove_file(&path).unwrap();

    let sink = Arc::new(SummarySink::default());
    let summary = assert_ok!(run(config, sink.clone()).await);
    assert_eq!(summary.worlds[0].columns, 9 * 256);
    assert_eq!(sink.chunks(), 9);
    assert!(sink.blocks() > 0);
    assert_err!(ServerConfig::load(&path));
}
