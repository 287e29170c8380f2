//! Sigma points for the augmented CTRV state.
//!
//! Uses the simple spread λ = 3 − n_aug, which gives
//! w₀ = λ/(λ+n_aug) = −4/3 and wᵢ = 1/(2(λ+n_aug)) = 1/6 for the other 14 points.
//! A single weight set serves for both mean and covariance recombination.

use crate::{
    angle::normalize_angle,
    ctrv::ProcessNoise,
    error::{FusionError, FusionResult},
    types::{
        AugCov, AugSigmaPoints, AugVec, SigmaWeights, StateCov, StateSigmaPoints, StateVec,
        N_AUG, N_SIGMA, N_X, YAW,
    },
};
use nalgebra::{SMatrix, SVector};

/// Spread parameter λ.
pub const LAMBDA: f64 = 3.0 - N_AUG as f64;

/// Recombination weights; computed once per estimator.
pub fn weights() -> SigmaWeights {
    let denom = LAMBDA + N_AUG as f64;
    let mut w = SigmaWeights::from_element(0.5 / denom);
    w[0] = LAMBDA / denom;
    w
}

/// Build the augmented mean and covariance from the current state.
pub fn augment(x: &StateVec, p: &StateCov, noise: &ProcessNoise) -> (AugVec, AugCov) {
    let mut x_aug = AugVec::zeros();
    x_aug.fixed_rows_mut::<N_X>(0).copy_from(x);

    let mut p_aug = AugCov::zeros();
    p_aug.fixed_view_mut::<N_X, N_X>(0, 0).copy_from(p);
    p_aug[(N_X, N_X)] = noise.std_a * noise.std_a;
    p_aug[(N_X + 1, N_X + 1)] = noise.std_yawdd * noise.std_yawdd;

    (x_aug, p_aug)
}

/// Generate the 15 augmented sigma points: mean, then mean ± √(λ+n_aug)·Lᵢ.
pub fn augmented_sigma_points(
    x: &StateVec,
    p: &StateCov,
    noise: &ProcessNoise,
) -> FusionResult<AugSigmaPoints> {
    let (x_aug, p_aug) = augment(x, p, noise);
    let l = p_aug
        .cholesky()
        .ok_or(FusionError::CovarianceNotPositiveDefinite)?
        .l();
    // A zero pivot still factorizes, but leaves a rank-deficient square root
    if l.diagonal().iter().any(|d| !(*d > 0.0 && d.is_finite())) {
        return Err(FusionError::CovarianceNotPositiveDefinite);
    }
    let spread = (LAMBDA + N_AUG as f64).sqrt();

    let mut points = AugSigmaPoints::zeros();
    points.set_column(0, &x_aug);
    for i in 0..N_AUG {
        let offset = l.column(i) * spread;
        points.set_column(i + 1, &(x_aug + offset));
        points.set_column(i + 1 + N_AUG, &(x_aug - offset));
    }
    Ok(points)
}

/// Difference `point − mean` with the listed angle components wrapped into (−π, π].
pub fn deviation<const R: usize>(
    point: &SVector<f64, R>,
    mean: &SVector<f64, R>,
    angles: &[usize],
) -> SVector<f64, R> {
    let mut d = point - mean;
    for &i in angles {
        d[i] = normalize_angle(d[i]);
    }
    d
}

/// Weighted mean and covariance of a set of sigma points.
///
/// Angle components are averaged as offsets from the central point and the
/// result is wrapped into (−π, π]. They are wrapped again in every deviation
/// before the outer product, so points straddling ±π don't inflate the
/// covariance.
pub fn recombine<const R: usize>(
    points: &SMatrix<f64, R, N_SIGMA>,
    weights: &SigmaWeights,
    angles: &[usize],
) -> (SVector<f64, R>, SMatrix<f64, R, R>) {
    let mut mean = points * weights;
    for &a in angles {
        let center = points[(a, 0)];
        let offset: f64 = (0..N_SIGMA)
            .map(|i| weights[i] * normalize_angle(points[(a, i)] - center))
            .sum();
        mean[a] = normalize_angle(center + offset);
    }
    let mut cov = SMatrix::<f64, R, R>::zeros();
    for i in 0..N_SIGMA {
        let d = deviation(&points.column(i).into_owned(), &mean, angles);
        cov += d * d.transpose() * weights[i];
    }
    (mean, cov)
}

/// Predicted state mean and covariance from propagated sigma points.
pub fn predicted_moments(points: &StateSigmaPoints, weights: &SigmaWeights) -> (StateVec, StateCov) {
    let (x, p) = recombine(points, weights, &[YAW]);
    (x, symmetrize(&p))
}

/// (P + Pᵀ) / 2
pub fn symmetrize<const R: usize>(p: &SMatrix<f64, R, R>) -> SMatrix<f64, R, R> {
    (p + p.transpose()) * 0.5
}
