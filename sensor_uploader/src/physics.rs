//! Vertical acceleration
//! Projects the device-frame linear acceleration onto the direction of gravity,
//! giving the component of motion aligned with "down".

use crate::types::Vec3;

/// Calculate vertical acceleration from linear acceleration and gravity
///
/// Math: a_vert = a_lin · (g / |g|)
///
/// A zero gravity vector (no gravity reading received yet) divides by zero,
/// so the unit vector and the result are NaN. That is returned as-is rather
/// than replaced by a sentinel; callers that upload the value decide how to
/// treat it (see `payload::NonFinitePolicy`).
pub fn calculate_vertical_acceleration(linear: &Vec3, gravity: &Vec3) -> f32 {
    let gravity_magnitude = gravity.norm();
    let unit_gravity = *gravity / gravity_magnitude;
    linear.dot(&unit_gravity)
}
