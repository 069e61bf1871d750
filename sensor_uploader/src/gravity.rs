use crate::types::{vec3, Vec3};
use std::sync::{Arc, RwLock};

/// Most recent gravity reading, shared between the gravity stream (writer)
/// and the vertical-acceleration calculation (reader).
///
/// Starts at (0, 0, 0) until the first gravity event arrives.
#[derive(Clone, Debug, Default)]
pub struct SharedGravity {
    inner: Arc<RwLock<Vec3>>,
}

impl SharedGravity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, x: f32, y: f32, z: f32) {
        match self.inner.write() {
            Ok(mut gravity) => *gravity = vec3(x, y, z),
            Err(poisoned) => *poisoned.into_inner() = vec3(x, y, z),
        }
    }

    pub fn current(&self) -> Vec3 {
        match self.inner.read() {
            Ok(gravity) => *gravity,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// True once any non-zero gravity reading has been stored
    pub fn is_known(&self) -> bool {
        self.current().norm() > 0.0
    }
}
