//! Unscented measurement update.
//!
//! Reuses the sigma points already propagated by the prediction step: each one
//! is mapped through the non-linear observation model h(·), and the spread of
//! the projected points gives the predicted measurement, its covariance and the
//! state/measurement cross-covariance. No Jacobians are needed.

use crate::{
    angle::normalize_angle,
    error::{FusionError, FusionResult},
    kf::KfUpdateResult,
    sigma::{deviation, recombine, symmetrize},
    types::{SensorKind, SigmaWeights, StateCov, StateSigmaPoints, StateVec, N_SIGMA, N_X, YAW},
};
use nalgebra::{SMatrix, SVector};
use sensor_models::ObservationModel;

/// Update `state`/`cov` with measurement `z` through the unscented transform.
///
/// `sigma_points` must be the predicted sigma points whose recombination
/// produced `state` and `cov`.
pub fn unscented_update<O, const M: usize>(
    state: &StateVec,
    cov: &StateCov,
    sigma_points: &StateSigmaPoints,
    weights: &SigmaWeights,
    z: &SVector<f64, M>,
    model: &O,
    sensor: SensorKind,
) -> FusionResult<KfUpdateResult<M>>
where
    O: ObservationModel<M>,
{
    let angles = model.angle_components();

    // 1. Project sigma points into measurement space
    let mut z_points = SMatrix::<f64, M, N_SIGMA>::zeros();
    for i in 0..N_SIGMA {
        z_points.set_column(i, &model.apply(&sigma_points.column(i).into_owned()));
    }

    // 2. Predicted measurement mean and innovation covariance S
    let (z_mean, s_points) = recombine(&z_points, weights, angles);
    let s = symmetrize(&s_points) + model.r_matrix();

    // 3. Cross-covariance T between state and measurement deviations
    let mut t = SMatrix::<f64, N_X, M>::zeros();
    for i in 0..N_SIGMA {
        let dz = deviation(&z_points.column(i).into_owned(), &z_mean, angles);
        let dx = deviation(&sigma_points.column(i).into_owned(), state, &[YAW]);
        t += dx * dz.transpose() * weights[i];
    }

    // 4. Gain and update
    let s_inv = s
        .try_inverse()
        .ok_or(FusionError::SingularInnovationCovariance { sensor })?;
    let k = t * s_inv;

    let innovation = deviation(z, &z_mean, angles);
    let mut new_state = state + k * innovation;
    new_state[YAW] = normalize_angle(new_state[YAW]);
    let new_cov = symmetrize(&(cov - k * s * k.transpose()));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ctrv::{predict_sigma_points, ProcessNoise},
        sigma::{augmented_sigma_points, predicted_moments, weights},
    };
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix2, Matrix3, Vector2, Vector3, Vector5};
    use sensor_models::{LidarObservation, RadarNoise, RadarObservation};

    fn predicted(x: StateVec, p: StateCov) -> (StateVec, StateCov, StateSigmaPoints) {
        let aug = augmented_sigma_points(&x, &p, &ProcessNoise::default()).unwrap();
        let points = predict_sigma_points(&aug, 0.1);
        let (x_pred, p_pred) = predicted_moments(&points, &weights());
        (x_pred, p_pred, points)
    }

    #[test]
    fn radar_update_pulls_towards_measurement() {
        let (x, p, points) = predicted(
            StateVec::new(10.0, 0.0, 2.0, 0.0, 0.0),
            StateCov::identity() * 0.5,
        );
        let model = RadarObservation::default();
        // Object reported further out and slightly counter-clockwise
        let z = Vector3::new(11.0, 0.05, 2.0);

        let res =
            unscented_update(&x, &p, &points, &weights(), &z, &model, SensorKind::Radar).unwrap();
        assert!(res.state[0] > x[0]);
        assert!(res.state[1] > x[1]);
        assert!(res.cov.trace() < p.trace());
        assert!(res.nis > 0.0);
        assert_abs_diff_eq!(res.cov, res.cov.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn bearing_residual_wraps_across_pi() {
        // Object almost exactly behind the sensor on the −x axis
        let (x, p, points) = predicted(
            StateVec::new(-10.0, 1e-3, 0.0, 0.0, 0.0),
            StateCov::identity() * 0.01,
        );
        let model = RadarObservation::default();
        // Measured just below the −π seam; the raw difference would be ≈ −2π
        let z = Vector3::new(10.0, -std::f64::consts::PI + 0.01, 0.0);

        let res =
            unscented_update(&x, &p, &points, &weights(), &z, &model, SensorKind::Radar).unwrap();
        assert!(res.innovation[1].abs() < 0.1, "bearing residual {}", res.innovation[1]);
        assert!(res.state[1] < 0.0, "should move below the x axis");
        assert!((res.state[0] + 10.0).abs() < 0.5);
    }

    #[test]
    fn linear_model_matches_closed_form_update() {
        // For a linear observation the unscented update equals the Kalman update
        let (x, p, points) = predicted(
            Vector5::new(1.0, 2.0, 1.0, 0.3, 0.1),
            StateCov::identity() * 0.2,
        );
        let model = LidarObservation::default();
        let z = Vector2::new(1.2, 2.1);

        let ut =
            unscented_update(&x, &p, &points, &weights(), &z, &model, SensorKind::Lidar).unwrap();
        let kf = crate::kf::lidar_update(&x, &p, &z, &model).unwrap();
        assert_abs_diff_eq!(ut.state, kf.state, epsilon = 1e-9);
        assert_abs_diff_eq!(ut.cov, kf.cov, epsilon = 1e-9);
        assert_abs_diff_eq!(ut.nis, kf.nis, epsilon = 1e-9);
    }

    struct DegenerateModel;

    impl ObservationModel<2> for DegenerateModel {
        fn apply(&self, _state: &StateVec) -> Vector2<f64> {
            Vector2::new(1.0, 1.0)
        }
        fn r_matrix(&self) -> Matrix2<f64> {
            Matrix2::zeros()
        }
    }

    #[test]
    fn singular_innovation_covariance_is_reported() {
        let (x, p, points) = predicted(StateVec::new(1.0, 1.0, 1.0, 0.0, 0.0), StateCov::identity());
        let err = unscented_update(
            &x,
            &p,
            &points,
            &weights(),
            &Vector2::new(1.0, 1.0),
            &DegenerateModel,
            SensorKind::Radar,
        )
        .unwrap_err();
        assert_eq!(
            err,
            FusionError::SingularInnovationCovariance {
                sensor: SensorKind::Radar
            }
        );
    }

    #[test]
    fn radar_noise_enters_innovation_covariance() {
        let (x, p, points) = predicted(
            StateVec::new(5.0, 5.0, 1.0, 0.5, 0.0),
            StateCov::identity() * 0.1,
        );
        let quiet = RadarObservation::new(RadarNoise {
            std_rho: 0.01,
            std_phi: 0.001,
            std_rho_dot: 0.01,
        });
        let noisy = RadarObservation::default();
        let z = noisy.apply(&x);
        let a = unscented_update(&x, &p, &points, &weights(), &z, &quiet, SensorKind::Radar).unwrap();
        let b = unscented_update(&x, &p, &points, &weights(), &z, &noisy, SensorKind::Radar).unwrap();
        let diff: Matrix3<f64> = b.innovation_cov - a.innovation_cov;
        assert_abs_diff_eq!(diff, noisy.r_matrix() - quiet.r_matrix(), epsilon = 1e-12);
    }
}
