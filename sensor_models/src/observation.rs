//! Observation models: h(x), H matrix, R matrix, polar↔cartesian conversion.
//!
//! # Measurement types supported
//! - **Lidar**: z = [px, py], H is a constant 2×5 matrix
//! - **Radar**: z = [rho, phi, rho_dot], non-linear in the CTRV state
//!
//! ## State vector
//! x = [px, py, v, yaw, yaw_rate]ᵀ  (5-dimensional)

use crate::noise::{LidarNoise, RadarNoise};
use nalgebra::{Matrix2, Matrix2x5, Matrix3, SMatrix, SVector, Vector2, Vector3, Vector5};
use serde::{Deserialize, Serialize};

/// Below this range (meters) the line of sight is undefined and range-rate is reported as 0.
pub const MIN_RANGE: f64 = 1e-4;

/// Trait for a sensor observation model with an `M`-dimensional measurement.
pub trait ObservationModel<const M: usize> {
    /// Map state to expected measurement h(x)
    fn apply(&self, state: &Vector5<f64>) -> SVector<f64, M>;
    /// Measurement noise covariance R
    fn r_matrix(&self) -> SMatrix<f64, M, M>;
    /// Indices of measurement components that are angles and wrap at ±π.
    fn angle_components(&self) -> &'static [usize] {
        &[]
    }
}

// ---------------------------------------------------------------------------
// Lidar
// ---------------------------------------------------------------------------

/// Lidar observation model: measures position directly.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LidarObservation {
    pub noise: LidarNoise,
}

impl LidarObservation {
    pub fn new(noise: LidarNoise) -> Self {
        Self { noise }
    }

    /// Observation matrix H selecting [px, py].
    pub fn h_matrix(&self) -> Matrix2x5<f64> {
        Matrix2x5::new(
            1., 0., 0., 0., 0., //
            0., 1., 0., 0., 0.,
        )
    }
}

impl ObservationModel<2> for LidarObservation {
    fn apply(&self, state: &Vector5<f64>) -> Vector2<f64> {
        Vector2::new(state[0], state[1])
    }

    fn r_matrix(&self) -> Matrix2<f64> {
        Matrix2::new(
            self.noise.std_px * self.noise.std_px,
            0.0,
            0.0,
            self.noise.std_py * self.noise.std_py,
        )
    }
}

// ---------------------------------------------------------------------------
// Radar (range, bearing, range-rate)
// ---------------------------------------------------------------------------

/// Radar observation model for a sensor sitting at the world origin.
/// z = [rho, phi, rho_dot], phi measured counter-clockwise from +x.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct RadarObservation {
    pub noise: RadarNoise,
}

impl RadarObservation {
    pub fn new(noise: RadarNoise) -> Self {
        Self { noise }
    }

    /// Convert polar [rho, phi] to cartesian [x, y].
    pub fn polar_to_cartesian(rho: f64, phi: f64) -> (f64, f64) {
        (rho * phi.cos(), rho * phi.sin())
    }
}

impl ObservationModel<3> for RadarObservation {
    fn apply(&self, state: &Vector5<f64>) -> Vector3<f64> {
        let (px, py, v, yaw) = (state[0], state[1], state[2], state[3]);
        let rho = (px * px + py * py).sqrt();
        let phi = py.atan2(px);
        let rho_dot = if rho < MIN_RANGE {
            0.0
        } else {
            (px * v * yaw.cos() + py * v * yaw.sin()) / rho
        };
        Vector3::new(rho, phi, rho_dot)
    }

    fn r_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&Vector3::new(
            self.noise.std_rho * self.noise.std_rho,
            self.noise.std_phi * self.noise.std_phi,
            self.noise.std_rho_dot * self.noise.std_rho_dot,
        ))
    }

    fn angle_components(&self) -> &'static [usize] {
        &[1]
    }
}
