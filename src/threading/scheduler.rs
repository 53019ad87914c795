// src/threading/scheduler.rs
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

use log::{debug, warn};

use crate::error::{TerrainError, TerrainResult};
use crate::terrain::chunk::{ChunkCoord, SlotId};
use crate::terrain::chunk_pool::ChunkPool;
use crate::terrain::marching::{MeshBuffer, sample_grid, triangulate};
use crate::terrain::noise::DensitySource;
use crate::terrain::terrain_config::TerrainParameters;
use crate::threading::thread_pool::ThreadPool;

/// One pipeline run: regenerate `coordinate` into `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkJob {
    pub slot: SlotId,
    pub coordinate: ChunkCoord,
    pub ticket: u64,
}

// Messages sent from the workers back to the publishing thread
#[derive(Debug)]
pub enum ChunkResult {
    Meshed { job: ChunkJob, mesh: MeshBuffer },
    Failed { job: ChunkJob, error: TerrainError },
}

impl ChunkResult {
    pub fn job(&self) -> ChunkJob {
        match self {
            ChunkResult::Meshed { job, .. } | ChunkResult::Failed { job, .. } => *job,
        }
    }
}

/// Running totals for the pipeline since the manager was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub dispatched: u64,
    pub meshed: u64,
    pub failed: u64,
    pub published: u64,
    pub stale: u64,
    pub empty_fallbacks: u64,
    pub dropped_requests: u64,
}

/// Moves queued dirty slots through sampling and triangulation on the worker
/// pool. Results come back over a channel and are applied by the owner.
pub struct PipelineScheduler {
    thread_pool: Arc<ThreadPool>,
    terrain: TerrainParameters,
    source: Arc<dyn DensitySource>,
    result_sender: Sender<ChunkResult>,
    result_receiver: Receiver<ChunkResult>,
    next_ticket: u64,
    in_flight: usize,
    stats: PipelineStats,
}

impl PipelineScheduler {
    pub fn new(
        thread_pool: Arc<ThreadPool>,
        terrain: TerrainParameters,
        source: Arc<dyn DensitySource>,
    ) -> Self {
        let (result_sender, result_receiver) = channel();
        PipelineScheduler {
            thread_pool,
            terrain,
            source,
            result_sender,
            result_receiver,
            next_ticket: 0,
            in_flight: 0,
            stats: PipelineStats::default(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut PipelineStats {
        &mut self.stats
    }

    /// Marks up to `limit` queued slots in flight and hands them to the workers.
    /// Returns the dispatched jobs.
    pub fn dispatch(&mut self, pool: &mut ChunkPool, limit: usize) -> TerrainResult<Vec<ChunkJob>> {
        let mut jobs = Vec::new();

        for (slot, coordinate) in pool.queued(limit) {
            self.next_ticket += 1;
            let job = ChunkJob { slot, coordinate, ticket: self.next_ticket };
            if !pool.mark_in_flight(slot, job.ticket)? {
                continue;
            }

            let terrain = self.terrain;
            let source = Arc::clone(&self.source);
            let sender = self.result_sender.clone();
            self.thread_pool.execute(move || {
                let result = run_job(&terrain, source.as_ref(), job);
                // Receiver is gone once the manager is dropped
                let _ = sender.send(result);
            });

            self.in_flight += 1;
            jobs.push(job);
        }

        if !jobs.is_empty() {
            self.stats.dispatched += jobs.len() as u64;
            debug!("PipelineScheduler: dispatched {} jobs, {} in flight", jobs.len(), self.in_flight);
        }
        Ok(jobs)
    }

    /// Drains finished results without blocking.
    pub fn collect_finished(&mut self) -> Vec<ChunkResult> {
        let mut results = Vec::new();
        loop {
            match self.result_receiver.try_recv() {
                Ok(result) => results.push(result),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.account(&results);
        results
    }

    /// Blocks until every dispatched job has reported back.
    pub fn wait_for_all(&mut self) -> TerrainResult<Vec<ChunkResult>> {
        let mut results = Vec::with_capacity(self.in_flight);
        while results.len() < self.in_flight {
            let result = self.result_receiver.recv().map_err(|_| TerrainError::ChannelClosed)?;
            results.push(result);
        }
        self.account(&results);
        Ok(results)
    }

    /// Runs `jobs` to completion on the worker pool, bypassing the channel.
    /// Results are returned in job order.
    pub fn extract_batch(&self, jobs: &[ChunkJob]) -> Vec<ChunkResult> {
        let terrain = &self.terrain;
        let source = self.source.as_ref();
        self.thread_pool.par_execute(jobs, |job| run_job(terrain, source, *job))
    }

    fn account(&mut self, results: &[ChunkResult]) {
        self.in_flight = self.in_flight.saturating_sub(results.len());
        for result in results {
            match result {
                ChunkResult::Meshed { .. } => self.stats.meshed += 1,
                ChunkResult::Failed { .. } => self.stats.failed += 1,
            }
        }
    }
}

impl std::fmt::Debug for PipelineScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineScheduler")
            .field("thread_pool", &self.thread_pool)
            .field("next_ticket", &self.next_ticket)
            .field("in_flight", &self.in_flight)
            .field("stats", &self.stats)
            .finish()
    }
}

// Stage A then Stage B for one chunk. A panic anywhere in the run is caught
// so it only costs this chunk.
fn run_job(terrain: &TerrainParameters, source: &dyn DensitySource, job: ChunkJob) -> ChunkResult {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let grid = sample_grid(terrain, source, job.coordinate);
        triangulate(&grid, terrain.surface())
    }));

    match outcome {
        Ok(mesh) => ChunkResult::Meshed { job, mesh },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("Worker: extraction of {} panicked: {}", job.coordinate, message);
            ChunkResult::Failed {
                job,
                error: TerrainError::ExtractionPanicked { coordinate: job.coordinate, message },
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
