// src/terrain/visibility.rs
use std::collections::HashSet;

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::TerrainResult;
use crate::terrain::chunk::{ChunkCoord, SlotId};
use crate::terrain::chunk_pool::ChunkPool;
use crate::terrain::terrain_config::TerrainParameters;

/// Order in which requested coordinates claim pooled slots. Only matters when
/// the pool runs out; excess coordinates wait for a later tick either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Scan order around the viewer's chunk.
    #[default]
    ScanOrder,
    /// Closest chunk centres first.
    NearestFirst,
}

/// What one visibility tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityUpdate {
    pub newly_dirty: Vec<(SlotId, ChunkCoord)>,
    pub newly_pooled: Vec<SlotId>,
    /// Requested coordinates that found no pooled slot this tick.
    pub dropped_requests: usize,
}

impl VisibilityUpdate {
    pub fn is_noop(&self) -> bool {
        self.newly_dirty.is_empty() && self.newly_pooled.is_empty() && self.dropped_requests == 0
    }
}

/// Squared distance from `point` to the box of `coordinate`.
pub fn sqr_distance_to_chunk(terrain: &TerrainParameters, point: Vec3, coordinate: ChunkCoord) -> f32 {
    let offset = point - coordinate.center(terrain.bounds_size());
    let v = (offset.abs() - Vec3::splat(terrain.bounds_size() / 2.0)).max(Vec3::ZERO);
    v.length_squared()
}

pub fn is_chunk_visible(terrain: &TerrainParameters, viewer: Vec3, coordinate: ChunkCoord) -> bool {
    sqr_distance_to_chunk(terrain, viewer, coordinate) <= terrain.sqr_view_distance()
}

/// Every chunk whose box intersects the view sphere, in scan order (x, then y, then z).
/// Coordinates outside the `i32` range and the unassigned sentinel are never requested.
pub fn requested_coordinates(terrain: &TerrainParameters, viewer: Vec3) -> Vec<ChunkCoord> {
    let radius = terrain.chunk_radius();
    // `as` saturates for viewers beyond the i32 grid
    let origin = (viewer / terrain.bounds_size()).round().as_ivec3();

    let mut requested = Vec::new();
    for x in (-radius..=radius).filter_map(|dx| origin.x.checked_add(dx)) {
        for y in (-radius..=radius).filter_map(|dy| origin.y.checked_add(dy)) {
            for z in (-radius..=radius).filter_map(|dz| origin.z.checked_add(dz)) {
                let coordinate = ChunkCoord::new(x, y, z);
                if !coordinate.is_unassigned() && is_chunk_visible(terrain, viewer, coordinate) {
                    requested.push(coordinate);
                }
            }
        }
    }
    requested
}

pub fn update_visibility(
    terrain: &TerrainParameters,
    viewer: Vec3,
    pool: &mut ChunkPool,
) -> TerrainResult<VisibilityUpdate> {
    update_visibility_with(terrain, viewer, pool, ExhaustionPolicy::default())
}

/// Reconciles the pool against the chunks the viewer needs: keeps slots whose
/// coordinate is still requested, pools the rest (unless their run is in
/// flight) and hands pooled slots to the remaining coordinates.
pub fn update_visibility_with(
    terrain: &TerrainParameters,
    viewer: Vec3,
    pool: &mut ChunkPool,
    policy: ExhaustionPolicy,
) -> TerrainResult<VisibilityUpdate> {
    let requested = requested_coordinates(terrain, viewer);
    let mut pending: HashSet<ChunkCoord> = requested.iter().copied().collect();
    let mut update = VisibilityUpdate::default();

    let active: Vec<(SlotId, ChunkCoord)> = pool.active().collect();
    for (id, coordinate) in active {
        if pending.remove(&coordinate) {
            continue;
        }
        if pool.release(id)? {
            update.newly_pooled.push(id);
        }
    }

    let mut remaining: Vec<ChunkCoord> =
        requested.into_iter().filter(|c| pending.contains(c)).collect();
    if policy == ExhaustionPolicy::NearestFirst {
        let bounds_size = terrain.bounds_size();
        remaining.sort_by(|a, b| {
            let da = a.center(bounds_size).distance_squared(viewer);
            let db = b.center(bounds_size).distance_squared(viewer);
            da.total_cmp(&db)
        });
    }

    let free: Vec<SlotId> = pool.pooled().collect();
    let mut free = free.into_iter();
    for coordinate in remaining {
        let Some(id) = free.next() else {
            update.dropped_requests += 1;
            continue;
        };
        if pool.assign(id, coordinate)? {
            update.newly_dirty.push((id, coordinate));
        }
    }

    if !update.is_noop() {
        debug!(
            "Visibility: {} assigned, {} pooled, {} dropped (viewer {})",
            update.newly_dirty.len(),
            update.newly_pooled.len(),
            update.dropped_requests,
            viewer
        );
    }
    Ok(update)
}
