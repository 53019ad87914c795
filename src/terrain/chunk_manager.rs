// src/terrain/chunk_manager.rs
use std::sync::Arc;

use glam::Vec3;
use log::{debug, info, warn};

use crate::config::{PipelineSettings, TerrainConfiguration, get_config};
use crate::error::TerrainResult;
use crate::terrain::chunk::SlotId;
use crate::terrain::chunk_pool::{ChunkPool, PublishOutcome};
use crate::terrain::marching::MeshBuffer;
use crate::terrain::noise::{DensityField, DensitySource};
use crate::terrain::terrain_config::TerrainParameters;
use crate::terrain::visibility::{VisibilityUpdate, update_visibility_with};
use crate::threading::scheduler::{ChunkJob, ChunkResult, PipelineScheduler, PipelineStats};
use crate::threading::thread_pool::ThreadPool;
use crate::utils::error_logger::ErrorLog;

/// Receives finished chunk meshes. Implementations must accept empty meshes.
pub trait ChunkRenderer {
    /// Show `mesh` for `slot`, replacing whatever the slot showed before.
    fn publish(&mut self, slot: SlotId, mesh: Arc<MeshBuffer>);
    /// Stop showing `slot`; it went back to the pool.
    fn hide(&mut self, slot: SlotId);
}

// Owns the chunk pool and drives visibility and the extraction pipeline once per frame
pub struct TerrainManager {
    terrain: TerrainParameters,
    pipeline: PipelineSettings,
    pool: ChunkPool,
    scheduler: PipelineScheduler,
    errors: ErrorLog,
}

impl TerrainManager {
    // Build everything from a configuration: density field, worker pool, chunk pool
    pub fn new(config: &TerrainConfiguration) -> TerrainResult<Self> {
        let terrain = config.validate()?;
        let field = DensityField::new(config.noise)?;
        let thread_pool = Arc::new(ThreadPool::new(config.pipeline.max_threads)?);
        Ok(Self::with_source(terrain, config.pipeline, Arc::new(field), thread_pool))
    }

    // Same as new, using the process-wide configuration
    pub fn from_global_config() -> TerrainResult<Self> {
        Self::new(&get_config())
    }

    pub fn with_source(
        terrain: TerrainParameters,
        pipeline: PipelineSettings,
        source: Arc<dyn DensitySource>,
        thread_pool: Arc<ThreadPool>,
    ) -> Self {
        let pool = ChunkPool::for_terrain(&terrain);
        info!(
            "TerrainManager: {} chunk slots, bounds {}, resolution {}, view distance {}, {} worker threads",
            pool.capacity(),
            terrain.bounds_size(),
            terrain.resolution(),
            terrain.view_distance(),
            thread_pool.num_threads()
        );

        TerrainManager {
            terrain,
            pipeline,
            pool,
            scheduler: PipelineScheduler::new(thread_pool, terrain, source),
            errors: ErrorLog::default(),
        }
    }

    pub fn terrain(&self) -> &TerrainParameters {
        &self.terrain
    }

    pub fn pipeline(&self) -> &PipelineSettings {
        &self.pipeline
    }

    pub fn pool(&self) -> &ChunkPool {
        &self.pool
    }

    pub fn stats(&self) -> PipelineStats {
        self.scheduler.stats()
    }

    pub fn in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }

    pub fn recent_errors(&self) -> Vec<String> {
        self.errors.get_error_history()
    }

    /// One frame: publish finished chunks, reconcile the pool against the
    /// viewer position, then dispatch queued chunks.
    pub fn update(&mut self, viewer: Vec3, renderer: &mut dyn ChunkRenderer) -> TerrainResult<VisibilityUpdate> {
        for result in self.scheduler.collect_finished() {
            self.apply_result(result, renderer)?;
        }

        let visibility =
            update_visibility_with(&self.terrain, viewer, &mut self.pool, self.pipeline.exhaustion_policy)?;
        for &slot in &visibility.newly_pooled {
            renderer.hide(slot);
        }
        if visibility.dropped_requests > 0 {
            debug!(
                "TerrainManager: pool exhausted, {} chunks wait for a free slot",
                visibility.dropped_requests
            );
            self.scheduler.stats_mut().dropped_requests += visibility.dropped_requests as u64;
        }

        self.scheduler.dispatch(&mut self.pool, self.pipeline.max_jobs_per_tick)?;
        Ok(visibility)
    }

    /// Waits for every dispatched chunk and publishes the results.
    pub fn flush(&mut self, renderer: &mut dyn ChunkRenderer) -> TerrainResult<()> {
        for result in self.scheduler.wait_for_all()? {
            self.apply_result(result, renderer)?;
        }
        Ok(())
    }

    /// Dispatches and publishes until no dirty chunk is left, retries included.
    pub fn settle(&mut self, renderer: &mut dyn ChunkRenderer) -> TerrainResult<()> {
        loop {
            self.flush(renderer)?;
            if self.scheduler.dispatch(&mut self.pool, self.pipeline.max_jobs_per_tick)?.is_empty() {
                return Ok(());
            }
        }
    }

    fn apply_result(&mut self, result: ChunkResult, renderer: &mut dyn ChunkRenderer) -> TerrainResult<()> {
        match result {
            ChunkResult::Meshed { job, mesh } => {
                self.publish(job, Arc::new(mesh), renderer)?;
            }
            ChunkResult::Failed { job, error } => {
                self.errors.log_error("Pipeline", &error.to_string());

                let failures = self.pool.slot(job.slot).map_or(0, |slot| slot.state().failures()) + 1;
                if failures > self.pipeline.max_retries {
                    warn!(
                        "TerrainManager: {} failed {} times, publishing an empty mesh",
                        job.coordinate, failures
                    );
                    if self.publish(job, Arc::default(), renderer)? {
                        self.scheduler.stats_mut().empty_fallbacks += 1;
                    }
                } else if self.pool.requeue_failed(job.slot, job.ticket)?.is_none() {
                    self.scheduler.stats_mut().stale += 1;
                }
            }
        }
        Ok(())
    }

    fn publish(
        &mut self,
        job: ChunkJob,
        mesh: Arc<MeshBuffer>,
        renderer: &mut dyn ChunkRenderer,
    ) -> TerrainResult<bool> {
        match self.pool.publish(job.slot, job.ticket, job.coordinate, Arc::clone(&mesh))? {
            PublishOutcome::Published => {
                renderer.publish(job.slot, mesh);
                self.scheduler.stats_mut().published += 1;
                Ok(true)
            }
            PublishOutcome::Stale => {
                self.scheduler.stats_mut().stale += 1;
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for TerrainManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainManager")
            .field("terrain", &self.terrain)
            .field("pipeline", &self.pipeline)
            .field("active", &self.pool.active_count())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use super::*;
    use crate::terrain::chunk::{ChunkCoord, SlotState};
    use crate::terrain::visibility::requested_coordinates;

    #[derive(Default)]
    struct RecordingRenderer {
        visible: HashMap<SlotId, Arc<MeshBuffer>>,
        publishes: usize,
        hides: usize,
    }

    impl ChunkRenderer for RecordingRenderer {
        fn publish(&mut self, slot: SlotId, mesh: Arc<MeshBuffer>) {
            self.visible.insert(slot, mesh);
            self.publishes += 1;
        }

        fn hide(&mut self, slot: SlotId) {
            self.visible.remove(&slot);
            self.hides += 1;
        }
    }

    fn terrain() -> TerrainParameters {
        TerrainParameters::new(10.0, 4, 0.0, 15.0).unwrap()
    }

    fn pipeline(max_jobs_per_tick: usize, max_retries: u32) -> PipelineSettings {
        PipelineSettings { max_threads: 2, max_jobs_per_tick, max_retries, ..Default::default() }
    }

    fn manager(source: Arc<dyn DensitySource>, pipeline: PipelineSettings) -> TerrainManager {
        let thread_pool = Arc::new(ThreadPool::new(pipeline.max_threads).unwrap());
        TerrainManager::with_source(terrain(), pipeline, source, thread_pool)
    }

    fn ground() -> Arc<dyn DensitySource> {
        Arc::new(|p: Vec3| 2.0 - p.y)
    }

    #[test]
    fn settled_pool_shows_every_requested_chunk() {
        let mut manager = manager(ground(), pipeline(16, 2));
        let mut renderer = RecordingRenderer::default();

        manager.update(Vec3::ZERO, &mut renderer).unwrap();
        manager.settle(&mut renderer).unwrap();

        let requested: BTreeSet<_> = requested_coordinates(&terrain(), Vec3::ZERO).into_iter().collect();
        let active: BTreeSet<_> = manager.pool().active().map(|(_, c)| c).collect();
        assert_eq!(active, requested);
        assert_eq!(manager.pool().dirty_count(), 0);
        assert_eq!(renderer.visible.len(), requested.len());
        assert_eq!(manager.stats().published, requested.len() as u64);

        // the ground plane crosses only chunks around y = 0
        for (slot, mesh) in &renderer.visible {
            let coord = manager.pool().slot(*slot).unwrap().coordinate();
            if coord.0.y != 0 {
                assert!(mesh.is_empty(), "{coord} should be empty");
            }
        }
        assert!(renderer.visible.values().any(|mesh| !mesh.is_empty()));
    }

    #[test]
    fn dispatch_is_capped_per_tick() {
        let mut manager = manager(ground(), pipeline(3, 2));
        let mut renderer = RecordingRenderer::default();

        manager.update(Vec3::ZERO, &mut renderer).unwrap();
        assert!(manager.in_flight() <= 3);
        assert_eq!(manager.stats().dispatched, 3);
        manager.flush(&mut renderer).unwrap();
    }

    #[test]
    fn moving_away_hides_pooled_slots() {
        let mut manager = manager(ground(), pipeline(64, 2));
        let mut renderer = RecordingRenderer::default();

        manager.update(Vec3::ZERO, &mut renderer).unwrap();
        manager.settle(&mut renderer).unwrap();
        let shown_before = renderer.visible.len();

        manager.update(Vec3::new(200.0, 0.0, 0.0), &mut renderer).unwrap();
        assert_eq!(renderer.hides, shown_before);
        assert!(renderer.visible.is_empty());
        manager.settle(&mut renderer).unwrap();

        let requested: BTreeSet<_> =
            requested_coordinates(&terrain(), Vec3::new(200.0, 0.0, 0.0)).into_iter().collect();
        let active: BTreeSet<_> = manager.pool().active().map(|(_, c)| c).collect();
        assert_eq!(active, requested);
    }

    #[test]
    fn repeated_failures_publish_an_empty_mesh() {
        let broken = ChunkCoord::new(1, 0, 0);
        let bounds = terrain().bounds_size();
        // only interior samples of the broken chunk, shared faces stay healthy
        let source: Arc<dyn DensitySource> = Arc::new(move |p: Vec3| {
            if (p - broken.center(bounds)).abs().max_element() < bounds / 2.0 - 0.1 {
                panic!("corrupt sample");
            }
            2.0 - p.y
        });
        let mut manager = manager(source, pipeline(64, 2));
        let mut renderer = RecordingRenderer::default();

        manager.update(Vec3::ZERO, &mut renderer).unwrap();
        manager.settle(&mut renderer).unwrap();

        let (slot, _) = manager
            .pool()
            .active()
            .find(|(_, c)| *c == broken)
            .unwrap();
        assert_eq!(
            manager.pool().slot(slot).unwrap().state(),
            SlotState::ActiveClean { coordinate: broken }
        );
        assert!(renderer.visible[&slot].is_empty());

        let stats = manager.stats();
        assert_eq!(stats.empty_fallbacks, 1);
        // first attempt plus two retries
        assert_eq!(stats.failed, 3);
        assert_eq!(manager.recent_errors().len(), 3);
    }

    #[test]
    fn retry_succeeds_without_fallback() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let tripped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&tripped);
        let source: Arc<dyn DensitySource> = Arc::new(move |p: Vec3| {
            if p == Vec3::splat(-5.0) && !flag.swap(true, Ordering::SeqCst) {
                panic!("transient failure");
            }
            2.0 - p.y
        });
        let mut manager = manager(source, pipeline(64, 1));
        let mut renderer = RecordingRenderer::default();

        manager.update(Vec3::ZERO, &mut renderer).unwrap();
        manager.settle(&mut renderer).unwrap();

        let stats = manager.stats();
        assert!(tripped.load(Ordering::SeqCst));
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.empty_fallbacks, 0);
        assert_eq!(manager.pool().dirty_count(), 0);
    }

    #[test]
    fn manager_builds_from_configuration() {
        let mut config = TerrainConfiguration::default();
        config.terrain.view_distance = 20.0;
        config.terrain.resolution = 4;
        config.pipeline.max_threads = 1;

        let mut manager = TerrainManager::new(&config).unwrap();
        assert_eq!(manager.pool().capacity(), 27);

        let mut renderer = RecordingRenderer::default();
        manager.update(Vec3::ZERO, &mut renderer).unwrap();
        manager.settle(&mut renderer).unwrap();
        assert_eq!(manager.pool().dirty_count(), 0);
        assert_eq!(renderer.publishes as u64, manager.stats().published);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut config = TerrainConfiguration::default();
        config.terrain.bounds_size = -1.0;
        assert!(TerrainManager::new(&config).is_err());
    }
}
