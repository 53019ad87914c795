// src/terrain/chunk.rs
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use glam::{IVec3, Vec3};

use crate::terrain::marching::MeshBuffer;

/// Integer coordinate of a chunk. The chunk covers a cube of side `bounds_size`
/// centred at `coordinate * bounds_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCoord(pub IVec3);

// Lexicographic on (x, y, z)
impl Ord for ChunkCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.to_array().cmp(&other.0.to_array())
    }
}

impl PartialOrd for ChunkCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl ChunkCoord {
    /// Coordinate reported by slots that hold no chunk.
    pub const UNASSIGNED: ChunkCoord = ChunkCoord(IVec3::splat(i32::MAX));

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        ChunkCoord(IVec3::new(x, y, z))
    }

    pub fn is_unassigned(self) -> bool {
        self == Self::UNASSIGNED
    }

    /// World-space centre of the chunk.
    pub fn center(self, bounds_size: f32) -> Vec3 {
        self.0.as_vec3() * bounds_size
    }
}

impl From<IVec3> for ChunkCoord {
    fn from(value: IVec3) -> Self {
        ChunkCoord(value)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk ({}, {}, {})", self.0.x, self.0.y, self.0.z)
    }
}

/// Stable index of a slot in the chunk pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a dirty slot's pipeline run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Waiting to be dispatched. `failures` counts earlier runs that did not publish.
    Queued { failures: u32 },
    /// Dispatched under `ticket`; the slot is frozen until that run publishes.
    InFlight { ticket: u64, failures: u32 },
}

/// Occupancy of a chunk slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pooled,
    ActiveDirty { coordinate: ChunkCoord, run: RunStatus },
    ActiveClean { coordinate: ChunkCoord },
}

impl SlotState {
    pub fn coordinate(&self) -> ChunkCoord {
        match *self {
            SlotState::Pooled => ChunkCoord::UNASSIGNED,
            SlotState::ActiveDirty { coordinate, .. } | SlotState::ActiveClean { coordinate } => {
                coordinate
            }
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, SlotState::Pooled)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SlotState::ActiveDirty { run: RunStatus::InFlight { .. }, .. }
        )
    }

    /// Consecutive failed runs of a dirty slot, zero otherwise.
    pub fn failures(&self) -> u32 {
        match *self {
            SlotState::ActiveDirty { run: RunStatus::Queued { failures }, .. }
            | SlotState::ActiveDirty { run: RunStatus::InFlight { failures, .. }, .. } => failures,
            _ => 0,
        }
    }
}

/// One reusable unit of chunk storage.
#[derive(Debug, Clone)]
pub struct ChunkSlot {
    pub(crate) state: SlotState,
    pub(crate) mesh: Arc<MeshBuffer>,
}

impl ChunkSlot {
    pub(crate) fn new() -> Self {
        ChunkSlot {
            state: SlotState::Pooled,
            mesh: Arc::new(MeshBuffer::default()),
        }
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn coordinate(&self) -> ChunkCoord {
        self.state.coordinate()
    }

    /// Handle to the last published mesh. Empty while the slot is pooled.
    pub fn mesh(&self) -> Arc<MeshBuffer> {
        Arc::clone(&self.mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pooled_state_reports_sentinel() {
        let slot = ChunkSlot::new();
        assert!(slot.coordinate().is_unassigned());
        assert!(!slot.state().is_active());
        assert!(slot.mesh().is_empty());
    }

    #[test]
    fn coordinates_order_by_x_then_y_then_z() {
        let mut coords = vec![
            ChunkCoord::new(1, 0, 0),
            ChunkCoord::new(0, 2, -1),
            ChunkCoord::new(0, 2, -3),
            ChunkCoord::new(-1, 5, 5),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                ChunkCoord::new(-1, 5, 5),
                ChunkCoord::new(0, 2, -3),
                ChunkCoord::new(0, 2, -1),
                ChunkCoord::new(1, 0, 0),
            ]
        );
        assert!(ChunkCoord::UNASSIGNED > ChunkCoord::new(i32::MAX, i32::MAX, 0));
    }

    #[test]
    fn coordinate_display_and_center() {
        let coord = ChunkCoord::new(1, -2, 3);
        assert_eq!(coord.to_string(), "Chunk (1, -2, 3)");
        assert_eq!(coord.center(10.0), Vec3::new(10.0, -20.0, 30.0));
    }
}
