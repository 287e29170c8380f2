//! Linear Kalman update for the lidar position sensor.
//!
//! # Update equations
//! ν = z − H·x
//! S = H·P·Hᵀ + R
//! K = P·Hᵀ·S⁻¹
//! x' = x + K·ν
//! P' = (I − K·H)·P
//!
//! H selects [px, py] from the CTRV state, so the update is exact; no sigma
//! points are needed.

use crate::{
    angle::normalize_angle,
    error::{FusionError, FusionResult},
    sigma::symmetrize,
    types::{SensorKind, StateCov, StateVec, N_X, YAW},
};
use nalgebra::{SMatrix, SVector, Vector2};
use sensor_models::{LidarObservation, ObservationModel};

/// Result of a measurement update, kept for diagnostics.
#[derive(Clone, Debug)]
pub struct KfUpdateResult<const M: usize> {
    pub state: StateVec,
    pub cov: StateCov,
    /// Innovation ν = z − ẑ (angle components wrapped)
    pub innovation: SVector<f64, M>,
    /// Innovation covariance S
    pub innovation_cov: SMatrix<f64, M, M>,
    /// Kalman gain K
    pub kalman_gain: SMatrix<f64, N_X, M>,
    /// Normalized innovation squared νᵀ·S⁻¹·ν
    pub nis: f64,
}

/// Lidar update. Fails if S cannot be inverted.
pub fn lidar_update(
    state: &StateVec,
    cov: &StateCov,
    z: &Vector2<f64>,
    model: &LidarObservation,
) -> FusionResult<KfUpdateResult<2>> {
    let h = model.h_matrix();

    let innovation = z - h * state;
    let s = h * cov * h.transpose() + model.r_matrix();

    let s_inv = s
        .try_inverse()
        .ok_or(FusionError::SingularInnovationCovariance {
            sensor: SensorKind::Lidar,
        })?;
    let k = cov * h.transpose() * s_inv;

    let mut new_state = state + k * innovation;
    new_state[YAW] = normalize_angle(new_state[YAW]);
    let new_cov = symmetrize(&((StateCov::identity() - k * h) * cov));
    let nis = (innovation.transpose() * s_inv * innovation)[(0, 0)];

    Ok(KfUpdateResult {
        state: new_state,
        cov: new_cov,
        innovation,
        innovation_cov: s,
        kalman_gain: k,
        nis,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
