//! Fundamental types used across the entire workspace.

use nalgebra::{Matrix5, SMatrix, SVector, Vector5};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Dimensions: all fixed at compile time.
// ---------------------------------------------------------------------------

/// State dimension: [px, py, v, yaw, yaw_rate]
pub const N_X: usize = 5;
/// Augmented dimension: state + [nu_a, nu_yawdd]
pub const N_AUG: usize = 7;
/// Number of sigma points, 2·N_AUG + 1
pub const N_SIGMA: usize = 2 * N_AUG + 1;

/// Index of the heading angle inside the state vector.
pub const YAW: usize = 3;

/// 5-element CTRV state vector: [px, py, v, yaw, yaw_rate]
pub type StateVec = Vector5<f64>;

/// 5×5 state covariance matrix
pub type StateCov = Matrix5<f64>;

/// Augmented state vector (state + two process-noise placeholders)
pub type AugVec = SVector<f64, N_AUG>;

/// Augmented covariance
pub type AugCov = SMatrix<f64, N_AUG, N_AUG>;

/// Augmented sigma points, one per column
pub type AugSigmaPoints = SMatrix<f64, N_AUG, N_SIGMA>;

/// Sigma points propagated into state space, one per column
pub type StateSigmaPoints = SMatrix<f64, N_X, N_SIGMA>;

/// Unscented transform weights
pub type SigmaWeights = SVector<f64, N_SIGMA>;

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

/// Which sensor produced a measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Linear position sensor: [px, py]
    Lidar,
    /// Range / bearing / range-rate sensor: [rho, phi, rho_dot]
    Radar,
}

impl SensorKind {
    /// Dimension of the raw measurement vector.
    pub fn dim(self) -> usize {
        match self {
            SensorKind::Lidar => 2,
            SensorKind::Radar => 3,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Lidar => write!(f, "lidar"),
            SensorKind::Radar => write!(f, "radar"),
        }
    }
}

/// A single timestamped sensor measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub sensor: SensorKind,
    /// Raw values; length must match `sensor.dim()`
    pub values: Vec<f64>,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
}

impl Measurement {
    pub fn lidar(px: f64, py: f64, timestamp_us: u64) -> Self {
        Self {
            sensor: SensorKind::Lidar,
            values: vec![px, py],
            timestamp_us,
        }
    }

    pub fn radar(rho: f64, phi: f64, rho_dot: f64, timestamp_us: u64) -> Self {
        Self {
            sensor: SensorKind::Radar,
            values: vec![rho, phi, rho_dot],
            timestamp_us,
        }
    }
}

/// Velocity components of a CTRV state, (vx, vy).
pub fn velocity_xy(state: &StateVec) -> (f64, f64) {
    (state[2] * state[YAW].cos(), state[2] * state[YAW].sin())
}
