// src/terrain/chunk_pool.rs
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{TerrainError, TerrainResult};
use crate::terrain::chunk::{ChunkCoord, ChunkSlot, RunStatus, SlotId, SlotState};
use crate::terrain::marching::MeshBuffer;
use crate::terrain::terrain_config::TerrainParameters;

/// Outcome of handing a finished run back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The mesh replaced the slot's previous one.
    Published,
    /// The run no longer matches the slot; nothing changed.
    Stale,
}

/// Fixed set of chunk slots. Slots are created once and only relabelled.
#[derive(Debug, Clone)]
pub struct ChunkPool {
    slots: Vec<ChunkSlot>,
}

impl ChunkPool {
    pub fn new(capacity: usize) -> Self {
        ChunkPool {
            slots: (0..capacity).map(|_| ChunkSlot::new()).collect(),
        }
    }

    /// Pool large enough for every chunk that can be within view distance.
    pub fn for_terrain(terrain: &TerrainParameters) -> Self {
        Self::new(terrain.max_visible_chunks())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, id: SlotId) -> Option<&ChunkSlot> {
        self.slots.get(id.0)
    }

    pub fn slots(&self) -> impl Iterator<Item = (SlotId, &ChunkSlot)> {
        self.slots.iter().enumerate().map(|(i, slot)| (SlotId(i), slot))
    }

    pub fn active(&self) -> impl Iterator<Item = (SlotId, ChunkCoord)> + '_ {
        self.slots()
            .filter(|(_, slot)| slot.state.is_active())
            .map(|(id, slot)| (id, slot.coordinate()))
    }

    /// Pooled slots in ascending id order.
    pub fn pooled(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots()
            .filter(|(_, slot)| slot.state == SlotState::Pooled)
            .map(|(id, _)| id)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn pooled_count(&self) -> usize {
        self.capacity() - self.active_count()
    }

    pub fn dirty_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.state, SlotState::ActiveDirty { .. }))
            .count()
    }

    pub fn in_flight_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.state.is_in_flight()).count()
    }

    fn slot_mut(&mut self, id: SlotId) -> TerrainResult<&mut ChunkSlot> {
        self.slots.get_mut(id.0).ok_or(TerrainError::UnknownSlot(id))
    }

    /// Pooled → ActiveDirty. Returns false if the slot was not pooled.
    pub(crate) fn assign(&mut self, id: SlotId, coordinate: ChunkCoord) -> TerrainResult<bool> {
        let slot = self.slot_mut(id)?;
        if slot.state != SlotState::Pooled {
            return Ok(false);
        }
        slot.state = SlotState::ActiveDirty {
            coordinate,
            run: RunStatus::Queued { failures: 0 },
        };
        Ok(true)
    }

    /// Active → Pooled, dropping the slot's mesh. Slots with a run in flight
    /// are left alone.
    pub(crate) fn release(&mut self, id: SlotId) -> TerrainResult<bool> {
        let slot = self.slot_mut(id)?;
        if !slot.state.is_active() || slot.state.is_in_flight() {
            return Ok(false);
        }
        slot.state = SlotState::Pooled;
        slot.mesh = Arc::default();
        Ok(true)
    }

    /// Queued dirty slots, lowest id first, at most `limit`.
    pub fn queued(&self, limit: usize) -> Vec<(SlotId, ChunkCoord)> {
        self.slots()
            .filter_map(|(id, slot)| match slot.state {
                SlotState::ActiveDirty { coordinate, run: RunStatus::Queued { .. } } => {
                    Some((id, coordinate))
                }
                _ => None,
            })
            .take(limit)
            .collect()
    }

    /// Queued → InFlight under `ticket`.
    pub(crate) fn mark_in_flight(&mut self, id: SlotId, ticket: u64) -> TerrainResult<bool> {
        let slot = self.slot_mut(id)?;
        match slot.state {
            SlotState::ActiveDirty { coordinate, run: RunStatus::Queued { failures } } => {
                slot.state = SlotState::ActiveDirty {
                    coordinate,
                    run: RunStatus::InFlight { ticket, failures },
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Swaps in the finished mesh and marks the slot clean.
    pub(crate) fn publish(
        &mut self,
        id: SlotId,
        ticket: u64,
        coordinate: ChunkCoord,
        mesh: Arc<MeshBuffer>,
    ) -> TerrainResult<PublishOutcome> {
        let slot = self.slot_mut(id)?;
        match slot.state {
            SlotState::ActiveDirty { coordinate: current, run: RunStatus::InFlight { ticket: t, .. } }
                if t == ticket && current == coordinate =>
            {
                slot.mesh = mesh;
                slot.state = SlotState::ActiveClean { coordinate };
                debug!("ChunkPool: slot {} published {}", id, coordinate);
                Ok(PublishOutcome::Published)
            }
            state => {
                warn!("ChunkPool: discarding stale result for slot {} ({:?}, ticket {})", id, state, ticket);
                Ok(PublishOutcome::Stale)
            }
        }
    }

    /// InFlight → Queued after a failed run. Returns the consecutive failure
    /// count, or `None` when the run did not match the slot.
    pub(crate) fn requeue_failed(&mut self, id: SlotId, ticket: u64) -> TerrainResult<Option<u32>> {
        let slot = self.slot_mut(id)?;
        match slot.state {
            SlotState::ActiveDirty { coordinate, run: RunStatus::InFlight { ticket: t, failures } }
                if t == ticket =>
            {
                let failures = failures + 1;
                slot.state = SlotState::ActiveDirty {
                    coordinate,
                    run: RunStatus::Queued { failures },
                };
                Ok(Some(failures))
            }
            _ => Ok(None),
        }
    }
}
