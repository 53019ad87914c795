// src/bin/terrain_stream.rs
// Flies a viewer in a straight line over the terrain and logs what the pool and
// the pipeline do each tick.
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use glam::Vec3;
use log::{error, info};

use march_terrain::config::global_config::{DEFAULT_CONFIG_PATH, init_config_manager};
use march_terrain::config::get_config;
use march_terrain::{ChunkRenderer, MeshBuffer, SlotId, TerrainManager, TerrainResult};

const DEFAULT_TICKS: u32 = 120;
const VIEWER_SPEED: f32 = 2.5;

#[derive(Parser, Debug)]
#[command(
    name = "terrain-stream",
    about = "Streams marching-cubes terrain around a moving viewer"
)]
struct Args {
    /// Terrain configuration file
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Frames to simulate before settling the pipeline
    #[arg(long, short, default_value_t = DEFAULT_TICKS)]
    ticks: u32,
}

// Keeps the last published mesh of every visible slot
#[derive(Default)]
struct MeshCounter {
    visible: HashMap<SlotId, Arc<MeshBuffer>>,
}

impl MeshCounter {
    fn triangles(&self) -> usize {
        self.visible.values().map(|mesh| mesh.triangle_count()).sum()
    }
}

impl ChunkRenderer for MeshCounter {
    fn publish(&mut self, slot: SlotId, mesh: Arc<MeshBuffer>) {
        self.visible.insert(slot, mesh);
    }

    fn hide(&mut self, slot: SlotId) {
        self.visible.remove(&slot);
    }
}

fn run(ticks: u32) -> TerrainResult<()> {
    let mut manager = TerrainManager::new(&get_config())?;
    let mut renderer = MeshCounter::default();

    for tick in 0..ticks {
        let viewer = Vec3::new(tick as f32 * VIEWER_SPEED, 0.0, tick as f32 * VIEWER_SPEED * 0.5);
        let visibility = manager.update(viewer, &mut renderer)?;
        info!(
            "tick {:>4} viewer {:>7.1} {:>7.1} | +{} -{} dropped {} | active {} dirty {} in flight {} | visible {} triangles {}",
            tick,
            viewer.x,
            viewer.z,
            visibility.newly_dirty.len(),
            visibility.newly_pooled.len(),
            visibility.dropped_requests,
            manager.pool().active_count(),
            manager.pool().dirty_count(),
            manager.in_flight(),
            renderer.visible.len(),
            renderer.triangles()
        );
    }

    manager.settle(&mut renderer)?;
    let stats = manager.stats();
    info!(
        "done: {} dispatched, {} published, {} failed, {} stale, {} empty fallbacks, {} dropped requests, {} triangles visible",
        stats.dispatched,
        stats.published,
        stats.failed,
        stats.stale,
        stats.empty_fallbacks,
        stats.dropped_requests,
        renderer.triangles()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    init_config_manager(&args.config);
    match run(args.ticks) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("terrain-stream failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
