//! The sensor-fusion estimator: one CTRV unscented Kalman filter per object.
//!
//! # Processing steps per measurement
//! 1. Refuse everything while poisoned (see [`FilterStatus::Diverged`])
//! 2. Validate the record: value count and finiteness
//! 3. First record initializes the state and sets the reference time
//! 4. Reject timestamps not strictly after the reference time
//! 5. Predict by Δt
//! 6. Correct with the lidar (linear) or radar (unscented) update, unless the
//!    sensor kind is disabled
//! 7. Commit state, covariance, sigma points and reference time together
//!
//! All maths in steps 5-6 runs on copies; a failure leaves the last good
//! estimate in place.

use crate::{
    angle::normalize_angle,
    ctrv::{predict_sigma_points, ProcessNoise},
    error::{FusionError, FusionResult},
    kf::{lidar_update, KfUpdateResult},
    sigma::{augmented_sigma_points, predicted_moments, weights},
    types::{Measurement, SensorKind, SigmaWeights, StateCov, StateSigmaPoints, StateVec, YAW},
    ukf::unscented_update,
};
use nalgebra::{Vector2, Vector3};
use sensor_models::{LidarNoise, LidarObservation, RadarNoise, RadarObservation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

const US_PER_SECOND: f64 = 1e6;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Estimator configuration, fixed at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UkfConfig {
    /// Longitudinal acceleration noise std dev (m/s²)
    pub std_a: f64,
    /// Yaw acceleration noise std dev (rad/s²)
    pub std_yawdd: f64,
    pub lidar: LidarNoise,
    pub radar: RadarNoise,
    /// Correct with lidar records; otherwise they only drive prediction
    pub use_lidar: bool,
    /// Correct with radar records; otherwise they only drive prediction
    pub use_radar: bool,
}

impl Default for UkfConfig {
    fn default() -> Self {
        let noise = ProcessNoise::default();
        Self {
            std_a: noise.std_a,
            std_yawdd: noise.std_yawdd,
            lidar: LidarNoise::default(),
            radar: RadarNoise::default(),
            use_lidar: true,
            use_radar: true,
        }
    }
}

impl UkfConfig {
    pub fn process_noise(&self) -> ProcessNoise {
        ProcessNoise {
            std_a: self.std_a,
            std_yawdd: self.std_yawdd,
        }
    }

    pub fn uses(&self, sensor: SensorKind) -> bool {
        match sensor {
            SensorKind::Lidar => self.use_lidar,
            SensorKind::Radar => self.use_radar,
        }
    }
}

// ---------------------------------------------------------------------------
// Status & report
// ---------------------------------------------------------------------------

/// Lifecycle of the estimator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStatus {
    /// Waiting for the first measurement
    Uninitialized,
    /// Holding a valid estimate
    Tracking,
    /// A numerical failure occurred; the last good estimate is kept and every
    /// further measurement is refused until [`CtrvUkf::reset`].
    Diverged,
}

/// What one call to [`CtrvUkf::process_measurement`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum StepReport {
    /// First record: state seeded from the measurement
    Initialized { sensor: SensorKind },
    /// Predicted by `dt` seconds, then corrected
    Updated { sensor: SensorKind, dt: f64, nis: f64 },
    /// Sensor kind is disabled: predicted by `dt` seconds, no correction
    Predicted { sensor: SensorKind, dt: f64 },
}

impl StepReport {
    /// NIS of the correction, if one was applied.
    pub fn nis(&self) -> Option<f64> {
        match self {
            StepReport::Updated { nis, .. } => Some(*nis),
            _ => None,
        }
    }
}

/// Candidate estimate built on copies, committed only on success.
struct Candidate {
    state: StateVec,
    cov: StateCov,
    sigma_points: StateSigmaPoints,
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// CTRV unscented Kalman filter fusing lidar and radar.
#[derive(Clone, Debug)]
pub struct CtrvUkf {
    config: UkfConfig,
    process_noise: ProcessNoise,
    lidar: LidarObservation,
    radar: RadarObservation,
    weights: SigmaWeights,
    state: StateVec,
    cov: StateCov,
    /// Sigma points of the most recent prediction
    sigma_points: StateSigmaPoints,
    /// Reference time in microseconds; `None` until initialized
    time_us: Option<u64>,
    status: FilterStatus,
}

impl Default for CtrvUkf {
    fn default() -> Self {
        Self::new(UkfConfig::default())
    }
}

impl CtrvUkf {
    pub fn new(config: UkfConfig) -> Self {
        Self {
            process_noise: config.process_noise(),
            lidar: LidarObservation::new(config.lidar),
            radar: RadarObservation::new(config.radar),
            weights: weights(),
            state: StateVec::zeros(),
            cov: StateCov::zeros(),
            sigma_points: StateSigmaPoints::zeros(),
            time_us: None,
            status: FilterStatus::Uninitialized,
            config,
        }
    }

    pub fn config(&self) -> &UkfConfig {
        &self.config
    }

    /// Current mean [px, py, v, yaw, yaw_rate].
    pub fn state(&self) -> &StateVec {
        &self.state
    }

    pub fn covariance(&self) -> &StateCov {
        &self.cov
    }

    /// Sigma points of the most recent prediction.
    pub fn sigma_points(&self) -> &StateSigmaPoints {
        &self.sigma_points
    }

    pub fn status(&self) -> FilterStatus {
        self.status
    }

    pub fn is_initialized(&self) -> bool {
        self.time_us.is_some()
    }

    /// Reference time of the estimate, in microseconds.
    pub fn timestamp_us(&self) -> Option<u64> {
        self.time_us
    }

    /// Forget the estimate and clear a divergence.
    pub fn reset(&mut self) {
        info!(status = ?self.status, "estimator reset");
        self.state = StateVec::zeros();
        self.cov = StateCov::zeros();
        self.sigma_points = StateSigmaPoints::zeros();
        self.time_us = None;
        self.status = FilterStatus::Uninitialized;
    }

    /// Fuse one measurement.
    pub fn process_measurement(&mut self, m: &Measurement) -> FusionResult<StepReport> {
        if self.status == FilterStatus::Diverged {
            return Err(FusionError::Diverged);
        }
        if let Err(e) = validate(m) {
            warn!(sensor = %m.sensor, t_us = m.timestamp_us, error = %e, "measurement rejected");
            return Err(e);
        }

        let previous = match self.time_us {
            None => {
                self.initialize(m);
                return Ok(StepReport::Initialized { sensor: m.sensor });
            }
            Some(t) => t,
        };

        if m.timestamp_us <= previous {
            let e = FusionError::NonMonotonicTimestamp {
                previous,
                current: m.timestamp_us,
            };
            warn!(sensor = %m.sensor, error = %e, "measurement rejected");
            return Err(e);
        }

        let dt = (m.timestamp_us - previous) as f64 / US_PER_SECOND;

        if !self.config.uses(m.sensor) {
            let prior = self.guard(|ukf| ukf.predicted(dt))?;
            self.commit(prior, m.timestamp_us);
            debug!(sensor = %m.sensor, dt, "sensor disabled, predicted only");
            return Ok(StepReport::Predicted {
                sensor: m.sensor,
                dt,
            });
        }

        let (candidate, nis) = self.guard(|ukf| ukf.step(m, dt))?;
        self.commit(candidate, m.timestamp_us);

        debug!(sensor = %m.sensor, dt, nis, "measurement fused");
        Ok(StepReport::Updated {
            sensor: m.sensor,
            dt,
            nis,
        })
    }

    /// Advance the estimate by `dt` seconds without a measurement.
    ///
    /// `dt` is rounded to whole microseconds; state and reference time both
    /// advance by the rounded step. Steps under half a microsecond are rejected.
    pub fn predict(&mut self, dt: f64) -> FusionResult<()> {
        if self.status == FilterStatus::Diverged {
            return Err(FusionError::Diverged);
        }
        let Some(previous) = self.time_us else {
            return Err(FusionError::NotInitialized);
        };
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(FusionError::InvalidTimeStep { dt });
        }
        let elapsed_us = (dt * US_PER_SECOND).round() as u64;
        if elapsed_us == 0 {
            return Err(FusionError::InvalidTimeStep { dt });
        }
        let step = elapsed_us as f64 / US_PER_SECOND;
        let candidate = self.guard(|ukf| ukf.predicted(step))?;
        self.commit(candidate, previous.saturating_add(elapsed_us));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn initialize(&mut self, m: &Measurement) {
        let (state, pos_var) = match m.sensor {
            SensorKind::Lidar => {
                let noise = &self.config.lidar;
                (
                    StateVec::new(m.values[0], m.values[1], 0.0, 0.0, 0.0),
                    (noise.std_px.powi(2), noise.std_py.powi(2)),
                )
            }
            SensorKind::Radar => {
                let (px, py) = RadarObservation::polar_to_cartesian(m.values[0], m.values[1]);
                let var = self.config.radar.init_position_std().powi(2);
                (StateVec::new(px, py, 0.0, 0.0, 0.0), (var, var))
            }
        };

        self.state = state;
        self.cov = StateCov::identity();
        self.cov[(0, 0)] = pos_var.0;
        self.cov[(1, 1)] = pos_var.1;
        self.sigma_points = StateSigmaPoints::zeros();
        self.time_us = Some(m.timestamp_us);
        self.status = FilterStatus::Tracking;

        info!(
            sensor = %m.sensor,
            t_us = m.timestamp_us,
            px = state[0],
            py = state[1],
            "estimator initialized"
        );
    }

    /// Run `f`; a numerical error marks the estimator as diverged.
    fn guard<T>(&mut self, f: impl FnOnce(&Self) -> FusionResult<T>) -> FusionResult<T> {
        f(self).map_err(|e| {
            if e.is_numerical() {
                error!(error = %e, t_us = ?self.time_us, "numerical failure, estimator diverged");
                self.status = FilterStatus::Diverged;
            }
            e
        })
    }

    fn predicted(&self, dt: f64) -> FusionResult<Candidate> {
        let aug = augmented_sigma_points(&self.state, &self.cov, &self.process_noise)?;
        let sigma_points = predict_sigma_points(&aug, dt);
        let (mut state, cov) = predicted_moments(&sigma_points, &self.weights);
        state[YAW] = normalize_angle(state[YAW]);
        check_finite(&state, &cov)?;
        Ok(Candidate {
            state,
            cov,
            sigma_points,
        })
    }

    fn step(&self, m: &Measurement, dt: f64) -> FusionResult<(Candidate, f64)> {
        let prior = self.predicted(dt)?;
        let update = self.correct(&prior, m)?;
        Ok((
            Candidate {
                state: update.state,
                cov: update.cov,
                sigma_points: prior.sigma_points,
            },
            update.nis,
        ))
    }

    fn correct(&self, prior: &Candidate, m: &Measurement) -> FusionResult<Corrected> {
        let corrected = match m.sensor {
            SensorKind::Lidar => {
                let z = Vector2::new(m.values[0], m.values[1]);
                Corrected::from(lidar_update(&prior.state, &prior.cov, &z, &self.lidar)?)
            }
            SensorKind::Radar => {
                let z = Vector3::new(m.values[0], m.values[1], m.values[2]);
                Corrected::from(unscented_update(
                    &prior.state,
                    &prior.cov,
                    &prior.sigma_points,
                    &self.weights,
                    &z,
                    &self.radar,
                    SensorKind::Radar,
                )?)
            }
        };
        check_finite(&corrected.state, &corrected.cov)?;
        Ok(corrected)
    }

    fn commit(&mut self, candidate: Candidate, time_us: u64) {
        self.state = candidate.state;
        self.cov = candidate.cov;
        self.sigma_points = candidate.sigma_points;
        self.time_us = Some(time_us);
    }
}

/// Posterior of a correction, independent of the measurement dimension.
struct Corrected {
    state: StateVec,
    cov: StateCov,
    nis: f64,
}

impl<const M: usize> From<KfUpdateResult<M>> for Corrected {
    fn from(res: KfUpdateResult<M>) -> Self {
        Self {
            state: res.state,
            cov: res.cov,
            nis: res.nis,
        }
    }
}

fn validate(m: &Measurement) -> FusionResult<()> {
    let expected = m.sensor.dim();
    if m.values.len() != expected {
        return Err(FusionError::MalformedMeasurement {
            sensor: m.sensor,
            expected,
            actual: m.values.len(),
        });
    }
    if m.values.iter().any(|v| !v.is_finite()) {
        return Err(FusionError::NonFiniteMeasurement { sensor: m.sensor });
    }
    Ok(())
}

fn check_finite(state: &StateVec, cov: &StateCov) -> FusionResult<()> {
    if state.iter().chain(cov.iter()).all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(FusionError::NonFiniteState)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
