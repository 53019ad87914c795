// src/terrain/marching/mesh.rs
use glam::Vec3;

/// Unwelded triangle soup produced for one chunk. Every triangle owns three
/// consecutive vertices, so `indices[i] == i` and both lengths are multiples of 3.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshBuffer {
    pub fn with_capacity(triangles: usize) -> Self {
        MeshBuffer {
            vertices: Vec::with_capacity(triangles * 3),
            indices: Vec::with_capacity(triangles * 3),
        }
    }

    pub fn push_triangle(&mut self, triangle: [Vec3; 3]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&triangle);
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }

    /// One normal per vertex, shared by the three vertices of each triangle.
    /// Degenerate triangles get a zero normal.
    pub fn flat_normals(&self) -> Vec<Vec3> {
        let mut normals = Vec::with_capacity(self.vertices.len());
        for [a, b, c] in self.triangles() {
            let n = (b - a).cross(c - a).normalize_or_zero();
            normals.extend_from_slice(&[n, n, n]);
        }
        normals
    }

    /// Axis-aligned bounds of the vertices, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(min, max), v| (min.min(*v), max.max(*v))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangles_get_sequential_indices() {
        let mut mesh = MeshBuffer::default();
        mesh.push_triangle([Vec3::ZERO, Vec3::X, Vec3::Y]);
        mesh.push_triangle([Vec3::Z, Vec3::X, Vec3::Y]);

        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn flat_normals_follow_winding() {
        let mut mesh = MeshBuffer::default();
        mesh.push_triangle([Vec3::ZERO, Vec3::X, Vec3::Y]);
        assert_eq!(mesh.flat_normals(), vec![Vec3::Z; 3]);
    }

    #[test]
    fn bounds_of_empty_and_filled_meshes() {
        let mut mesh = MeshBuffer::default();
        assert_eq!(mesh.bounds(), None);

        mesh.push_triangle([Vec3::new(-1.0, 2.0, 0.0), Vec3::X, Vec3::new(0.0, 0.0, 5.0)]);
        assert_eq!(mesh.bounds(), Some((Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 5.0))));
    }
}
