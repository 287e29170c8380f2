//! Sensor noise parameters.
//!
//! Values are the manufacturer's datasheet figures. They describe the sensor,
//! not the filter, so they are not meant to be tuned.

use serde::{Deserialize, Serialize};

/// Lidar position noise (standard deviations).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LidarNoise {
    /// Std deviation of the measured x position (meters)
    pub std_px: f64,
    /// Std deviation of the measured y position (meters)
    pub std_py: f64,
}

impl Default for LidarNoise {
    fn default() -> Self {
        Self {
            std_px: 0.15,
            std_py: 0.15,
        }
    }
}

/// Radar noise (standard deviations).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadarNoise {
    /// Range noise (meters)
    pub std_rho: f64,
    /// Bearing noise (radians)
    pub std_phi: f64,
    /// Range-rate noise (m/s)
    pub std_rho_dot: f64,
}

impl Default for RadarNoise {
    fn default() -> Self {
        Self {
            std_rho: 0.3,
            std_phi: 0.03,
            std_rho_dot: 0.3,
        }
    }
}

impl RadarNoise {
    /// Position std deviation used when a track is born from a radar return.
    ///
    /// Range and bearing noise are simply added; crude, but it only seeds the
    /// first covariance.
    pub fn init_position_std(&self) -> f64 {
        self.std_rho + self.std_phi
    }
}
