//! Linear algebra aliases for device-frame sensor vectors
//!
//! Sensor readings arrive as single-precision triples, so every vector in
//! the pipeline stays `f32` end to end.

use nalgebra::Vector3;

/// Device-frame 3-vector (m/s²)
pub type Vec3 = Vector3<f32>;

/// Build a device-frame vector from raw sensor components
pub fn vec3(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x, y, z)
}
