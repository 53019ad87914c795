pub mod tables;
pub mod mesh;
pub mod extraction;

pub use mesh::MeshBuffer;
pub use extraction::{extract, extract_with, sample_grid, triangulate, SampleGrid};
