pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event delivered by an external sensor or location source
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SensorEvent {
    /// Accelerometer reading with gravity removed
    LinearAcceleration { x: f32, y: f32, z: f32 },
    /// Sensor-estimated gravity vector
    Gravity { x: f32, y: f32, z: f32 },
    /// Location update
    Location(LocationFix),
}

/// Last known position
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationFix {
    /// Position reported before the first fix arrives
    pub const UNKNOWN: LocationFix = LocationFix {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Default for LocationFix {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// Values shown to the user after each processed linear-acceleration event
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveReadout {
    pub acc_x: f32,
    pub acc_y: f32,
    pub acc_z: f32,
    pub vertical_acc: f32,
}

impl fmt::Display for LiveReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AccX: {:.2}\nAccY: {:.2}\nAccZ: {:.2}\nVertical Acc: {:.2}",
            self.acc_x, self.acc_y, self.acc_z, self.vertical_acc
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readout_display() {
        let readout = LiveReadout {
            acc_x: 0.123,
            acc_y: -1.0,
            acc_z: 9.806,
            vertical_acc: 2.5,
        };
        assert_eq!(
            readout.to_string(),
            "AccX: 0.12\nAccY: -1.00\nAccZ: 9.81\nVertical Acc: 2.50"
        );
    }

    #[test]
    fn test_unknown_location_is_origin() {
        let fix = LocationFix::default();
        assert_eq!(fix.latitude, 0.0);
        assert_eq!(fix.longitude, 0.0);
    }
}
