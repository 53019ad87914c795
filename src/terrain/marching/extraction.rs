// src/terrain/marching/extraction.rs
use glam::{IVec3, Vec3, Vec4, Vec4Swizzles};
use rayon::prelude::*;

use super::mesh::MeshBuffer;
use super::tables::{CUBE_CORNERS, EDGE_CONNECTIONS, triangles_for};
use crate::error::TerrainResult;
use crate::terrain::chunk::ChunkCoord;
use crate::terrain::noise::{DensityField, DensitySource, NoiseParameters};
use crate::terrain::terrain_config::TerrainParameters;

/// Density samples of one chunk, `xyz` = world position and `w` = density,
/// stored at `x * r² + y * r + z`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    resolution: u32,
    samples: Vec<Vec4>,
}

impl SampleGrid {
    /// Wraps pre-computed samples. Returns `None` unless there are exactly
    /// `resolution³` of them and `resolution >= 2`.
    pub fn from_samples(resolution: u32, samples: Vec<Vec4>) -> Option<Self> {
        let r = resolution as usize;
        (resolution >= 2 && samples.len() == r * r * r).then_some(SampleGrid { resolution, samples })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn samples(&self) -> &[Vec4] {
        &self.samples
    }

    pub fn index(&self, xyz: IVec3) -> usize {
        index_from_coord(xyz, self.resolution)
    }

    pub fn get(&self, xyz: IVec3) -> Vec4 {
        self.samples[self.index(xyz)]
    }
}

pub fn index_from_coord(xyz: IVec3, resolution: u32) -> usize {
    let r = resolution as usize;
    xyz.x as usize * r * r + xyz.y as usize * r + xyz.z as usize
}

pub fn coord_from_index(index: usize, resolution: u32) -> IVec3 {
    let r = resolution as usize;
    IVec3::new((index / (r * r)) as i32, ((index / r) % r) as i32, (index % r) as i32)
}

/// Stage A: evaluates the field at every grid point of `coordinate`.
/// Points are independent and sampled in parallel.
pub fn sample_grid<D>(terrain: &TerrainParameters, source: &D, coordinate: ChunkCoord) -> SampleGrid
where
    D: DensitySource + ?Sized,
{
    let resolution = terrain.resolution();
    let spacing = terrain.spacing();
    let half = terrain.bounds_size() / 2.0;
    let center = coordinate.center(terrain.bounds_size());

    let samples = (0..terrain.points_per_chunk())
        .into_par_iter()
        .map(|i| {
            let xyz = coord_from_index(i, resolution);
            let position = center + xyz.as_vec3() * spacing - Vec3::splat(half);
            position.extend(source.density(position))
        })
        .collect();

    SampleGrid { resolution, samples }
}

/// Point on the edge `a → b` where the field crosses `surface`. `None` when the
/// two densities are equal or the result is not finite.
pub fn interpolate(a: Vec4, b: Vec4, surface: f32) -> Option<Vec3> {
    let denominator = b.w - a.w;
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    let t = (surface - a.w) / denominator;
    let point = a.xyz() + t * (b.xyz() - a.xyz());
    point.is_finite().then_some(point)
}

/// Corner configuration of a cell: bit `i` set iff corner `i` is above `surface`.
pub fn cube_mask(cube: &[Vec4; 8], surface: f32) -> u8 {
    cube.iter()
        .enumerate()
        .filter(|(_, corner)| corner.w > surface)
        .fold(0u8, |mask, (i, _)| mask | (1 << i))
}

/// Stage B: marches every cell of the grid and emits unwelded triangles.
/// Consumes a fully written grid.
pub fn triangulate(grid: &SampleGrid, surface: f32) -> MeshBuffer {
    let cells = grid.resolution as i32 - 1;
    let mut mesh = MeshBuffer::default();
    let mut cube = [Vec4::ZERO; 8];

    for x in 0..cells {
        for y in 0..cells {
            for z in 0..cells {
                let cell = IVec3::new(x, y, z);
                for (corner, offset) in cube.iter_mut().zip(CUBE_CORNERS) {
                    *corner = grid.get(cell + offset);
                }

                let mask = cube_mask(&cube, surface);
                for edges in triangles_for(mask) {
                    if let Some(triangle) = triangle_on_edges(&cube, edges, surface) {
                        mesh.push_triangle(triangle);
                    }
                }
            }
        }
    }

    mesh
}

fn triangle_on_edges(cube: &[Vec4; 8], edges: [usize; 3], surface: f32) -> Option<[Vec3; 3]> {
    let vertex = |edge: usize| {
        let [a, b] = EDGE_CONNECTIONS[edge];
        interpolate(cube[a], cube[b], surface)
    };
    Some([vertex(edges[0])?, vertex(edges[1])?, vertex(edges[2])?])
}

/// Samples and triangulates one chunk against any density source.
pub fn extract_with<D>(terrain: &TerrainParameters, source: &D, coordinate: ChunkCoord) -> MeshBuffer
where
    D: DensitySource + ?Sized,
{
    let grid = sample_grid(terrain, source, coordinate);
    triangulate(&grid, terrain.surface())
}

/// Synchronous extraction of one chunk from noise parameters.
pub fn extract(
    terrain: &TerrainParameters,
    noise: &NoiseParameters,
    coordinate: ChunkCoord,
) -> TerrainResult<MeshBuffer> {
    let field = DensityField::new(*noise)?;
    Ok(extract_with(terrain, &field, coordinate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_terrain(resolution: u32) -> TerrainParameters {
        TerrainParameters::new(1.0, resolution, 0.5, 1.0).unwrap()
    }

    #[test]
    fn flat_index_matches_layout() {
        assert_eq!(index_from_coord(IVec3::new(1, 2, 3), 4), 16 + 8 + 3);
        for i in 0..64 {
            assert_eq!(index_from_coord(coord_from_index(i, 4), 4), i);
        }
    }

    #[test]
    fn sample_positions_span_the_chunk() {
        let terrain = TerrainParameters::new(10.0, 3, 0.5, 15.0).unwrap();
        let grid = sample_grid(&terrain, &|p: Vec3| p.x, ChunkCoord::new(1, 0, -1));

        assert_eq!(grid.samples().len(), 27);
        let first = grid.get(IVec3::ZERO);
        let last = grid.get(IVec3::splat(2));
        assert_eq!(first.xyz(), Vec3::new(5.0, -5.0, -15.0));
        assert_eq!(last.xyz(), Vec3::new(15.0, 5.0, -5.0));
        assert_eq!(first.w, first.x);
        assert_eq!(grid.get(IVec3::new(1, 0, 0)).xyz(), Vec3::new(10.0, -5.0, -15.0));
    }

    #[test]
    fn interpolation_hits_midpoint() {
        let a = Vec4::new(0.0, 0.0, 0.0, 0.2);
        let b = Vec4::new(2.0, 4.0, 6.0, 0.8);
        assert_eq!(interpolate(a, b, 0.5), Some(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn degenerate_interpolation_is_rejected() {
        let a = Vec4::new(0.0, 0.0, 0.0, 0.3);
        let b = Vec4::new(1.0, 0.0, 0.0, 0.3);
        assert_eq!(interpolate(a, b, 0.5), None);

        let nan = Vec4::new(1.0, 0.0, 0.0, f32::NAN);
        assert_eq!(interpolate(a, nan, 0.5), None);
    }

    #[test]
    fn single_corner_above_surface() {
        let terrain = unit_terrain(2);
        let corner0 = Vec3::splat(-0.5);
        let field = move |p: Vec3| if p == corner0 { 0.75 } else { 0.25 };

        let mesh = extract_with(&terrain, &field, ChunkCoord::new(0, 0, 0));

        // mask 1 -> edges 0, 8, 3
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(
            mesh.vertices,
            vec![
                Vec3::new(0.0, -0.5, -0.5),
                Vec3::new(-0.5, 0.0, -0.5),
                Vec3::new(-0.5, -0.5, 0.0),
            ]
        );
    }

    #[test]
    fn hand_built_grid_triangulates_like_sampled_one() {
        let mut samples = Vec::new();
        for i in 0..8 {
            let xyz = coord_from_index(i, 2).as_vec3();
            let density = if i == 0 { 0.75 } else { 0.25 };
            samples.push(xyz.extend(density));
        }
        let grid = SampleGrid::from_samples(2, samples).unwrap();
        let mesh = triangulate(&grid, 0.5);

        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.vertices.iter().all(|v| v.length() <= 0.5 + f32::EPSILON));
    }

    #[test]
    fn from_samples_checks_length() {
        assert!(SampleGrid::from_samples(2, vec![Vec4::ZERO; 7]).is_none());
        assert!(SampleGrid::from_samples(1, vec![Vec4::ZERO; 1]).is_none());
    }

    #[test]
    fn empty_and_saturated_fields_produce_no_geometry() {
        let terrain = unit_terrain(6);
        let below = extract_with(&terrain, &|_: Vec3| 0.0, ChunkCoord::new(0, 0, 0));
        let above = extract_with(&terrain, &|_: Vec3| 1.0, ChunkCoord::new(0, 0, 0));

        assert!(below.vertices.is_empty() && below.indices.is_empty());
        assert!(above.vertices.is_empty() && above.indices.is_empty());
    }

    #[test]
    fn plane_is_meshed_at_the_surface_height() {
        let terrain = TerrainParameters::new(8.0, 9, 0.0, 8.0).unwrap();
        // density decreases upward, surface at y = 0.25
        let mesh = extract_with(&terrain, &|p: Vec3| 0.25 - p.y, ChunkCoord::new(0, 0, 0));

        assert!(!mesh.is_empty());
        assert_eq!(mesh.indices.len() % 3, 0);
        assert_eq!(mesh.vertices.len(), mesh.indices.len());
        for v in &mesh.vertices {
            assert!((v.y - 0.25).abs() < 1e-5, "vertex {v} off the plane");
        }
        // 8x8 cells crossed, two triangles each
        assert_eq!(mesh.triangle_count(), 128);
    }

    #[test]
    fn extraction_is_deterministic() {
        let terrain = TerrainParameters::new(20.0, 8, 0.5, 60.0).unwrap();
        let noise = NoiseParameters::default();
        let coord = ChunkCoord::new(0, 0, 0);

        let a = extract(&terrain, &noise, coord).unwrap();
        let b = extract(&terrain, &noise, coord).unwrap();
        assert_eq!(a.indices, b.indices);
        let bits = |m: &MeshBuffer| m.vertices.iter().flat_map(|v| v.to_array()).map(f32::to_bits).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn extraction_rejects_invalid_noise() {
        let terrain = unit_terrain(2);
        let noise = NoiseParameters { terrace_height: 0.0, ..Default::default() };
        assert!(extract(&terrain, &noise, ChunkCoord::new(0, 0, 0)).is_err());
    }
}
