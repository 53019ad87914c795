pub mod noise_parameters;
pub mod noise_utils;
pub mod density_field;

pub use noise_parameters::NoiseParameters;
pub use density_field::{DensityField, DensitySource};
