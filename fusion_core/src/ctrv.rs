//! CTRV (constant turn rate and velocity) process model.
//!
//! ## State vector
//! x = [px, py, v, yaw, yaw_rate]ᵀ
//!
//! ## Noise
//! Process noise enters through the augmented components ν_a (longitudinal
//! acceleration) and ν_ψ̈ (yaw acceleration), both held constant over Δt:
//!
//! px += ½Δt² cos(ψ) ν_a     v   += Δt ν_a
//! py += ½Δt² sin(ψ) ν_a     ψ   += ½Δt² ν_ψ̈
//!                           ψ̇   += Δt ν_ψ̈

use crate::types::{AugSigmaPoints, AugVec, StateSigmaPoints, StateVec, N_SIGMA};
use serde::{Deserialize, Serialize};

/// Yaw rates at or below this magnitude (rad/s) use the straight-line branch.
pub const YAW_RATE_EPSILON: f64 = 0.001;

/// Process noise standard deviations. These are the filter's tuning knobs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessNoise {
    /// Longitudinal acceleration std dev (m/s²)
    pub std_a: f64,
    /// Yaw acceleration std dev (rad/s²)
    pub std_yawdd: f64,
}

impl Default for ProcessNoise {
    fn default() -> Self {
        Self {
            std_a: 2.0,
            std_yawdd: 2.0,
        }
    }
}

/// The two cases of the noiseless CTRV position update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    /// Position advances along a circular arc of radius v/ψ̇.
    Curved,
    /// Limit ψ̇ → 0: position advances along the current heading.
    Straight,
}

impl Motion {
    /// Select the branch for a given yaw rate.
    pub fn for_yaw_rate(yaw_rate: f64) -> Self {
        if yaw_rate.abs() > YAW_RATE_EPSILON {
            Motion::Curved
        } else {
            Motion::Straight
        }
    }

    /// Noiseless position displacement (dx, dy) over `dt`.
    ///
    /// `Curved` divides by `yaw_rate`; callers pick the branch with
    /// [`Motion::for_yaw_rate`].
    pub fn displacement(self, v: f64, yaw: f64, yaw_rate: f64, dt: f64) -> (f64, f64) {
        match self {
            Motion::Curved => {
                let radius = v / yaw_rate;
                let yaw_end = yaw + yaw_rate * dt;
                (
                    radius * (yaw_end.sin() - yaw.sin()),
                    radius * (yaw.cos() - yaw_end.cos()),
                )
            }
            Motion::Straight => (v * yaw.cos() * dt, v * yaw.sin() * dt),
        }
    }
}

/// Propagate one augmented point [px, py, v, yaw, yaw_rate, ν_a, ν_ψ̈] by `dt` seconds.
pub fn propagate(aug: &AugVec, dt: f64) -> StateVec {
    let (px, py, v, yaw, yaw_rate) = (aug[0], aug[1], aug[2], aug[3], aug[4]);
    let (nu_a, nu_yawdd) = (aug[5], aug[6]);

    let (dx, dy) = Motion::for_yaw_rate(yaw_rate).displacement(v, yaw, yaw_rate, dt);
    let half_dt2 = 0.5 * dt * dt;

    StateVec::new(
        px + dx + half_dt2 * yaw.cos() * nu_a,
        py + dy + half_dt2 * yaw.sin() * nu_a,
        v + dt * nu_a,
        yaw + yaw_rate * dt + half_dt2 * nu_yawdd,
        yaw_rate + dt * nu_yawdd,
    )
}

/// Propagate every augmented sigma point into state space.
pub fn predict_sigma_points(aug_points: &AugSigmaPoints, dt: f64) -> StateSigmaPoints {
    let mut predicted = StateSigmaPoints::zeros();
    for i in 0..N_SIGMA {
        let aug = aug_points.column(i).into_owned();
        predicted.set_column(i, &propagate(&aug, dt));
    }
    predicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn aug(px: f64, py: f64, v: f64, yaw: f64, yaw_rate: f64) -> AugVec {
        AugVec::from_column_slice(&[px, py, v, yaw, yaw_rate, 0.0, 0.0])
    }

    #[test]
    fn branch_selection_uses_threshold() {
        assert_eq!(Motion::for_yaw_rate(0.0), Motion::Straight);
        assert_eq!(Motion::for_yaw_rate(YAW_RATE_EPSILON), Motion::Straight);
        assert_eq!(Motion::for_yaw_rate(-0.002), Motion::Curved);
        assert_eq!(Motion::for_yaw_rate(0.5), Motion::Curved);
    }

    #[test]
    fn quarter_circle() {
        // Radius 1 m: v = π/2 m/s, ψ̇ = π/2 rad/s for 1 s
        let next = propagate(&aug(0.0, 0.0, FRAC_PI_2, 0.0, FRAC_PI_2), 1.0);
        assert_abs_diff_eq!(next[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[2], FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(next[3], FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(next[4], FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn straight_line_matches_curved_limit() {
        let (v, yaw, dt) = (5.0, 0.7, 0.1);
        let (sx, sy) = Motion::Straight.displacement(v, yaw, 0.0, dt);
        for yaw_rate in [1e-3, 1e-4, 1e-5, -1e-5, 1e-6] {
            let (cx, cy) = Motion::Curved.displacement(v, yaw, yaw_rate, dt);
            // Arc deviates from the chord by O(v·ψ̇·Δt²)
            let tol = v * yaw_rate.abs() * dt * dt + 1e-8;
            assert_abs_diff_eq!(cx, sx, epsilon = tol);
            assert_abs_diff_eq!(cy, sy, epsilon = tol);
        }

        let next = propagate(&aug(1.0, 2.0, v, yaw, 0.0), dt);
        assert_abs_diff_eq!(next[0], 1.0 + sx, epsilon = 1e-12);
        assert_abs_diff_eq!(next[1], 2.0 + sy, epsilon = 1e-12);
        assert_abs_diff_eq!(next[3], yaw, epsilon = 1e-12);
    }

    #[test]
    fn noise_terms_enter_every_component() {
        let dt = 0.2;
        let mut a = aug(0.0, 0.0, 1.0, 0.0, 0.0);
        a[5] = 2.0;
        a[6] = -1.0;
        let next = propagate(&a, dt);
        assert_abs_diff_eq!(next[0], 1.0 * dt + 0.5 * dt * dt * 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[2], 1.0 + dt * 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(next[3], -0.5 * dt * dt, epsilon = 1e-12);
        assert_abs_diff_eq!(next[4], -dt, epsilon = 1e-12);
    }

    #[test]
    fn predicts_every_column() {
        let mut points = AugSigmaPoints::zeros();
        for i in 0..N_SIGMA {
            points.set_column(i, &aug(i as f64, 0.0, 1.0, 0.0, 0.0));
        }
        let predicted = predict_sigma_points(&points, 0.5);
        for i in 0..N_SIGMA {
            assert_abs_diff_eq!(predicted[(0, i)], i as f64 + 0.5, epsilon = 1e-12);
        }
    }
}
