//! Lidar/radar measurement simulator.
//!
//! Generates noisy measurements of the ground truth with:
//! - Gaussian noise at the sensors' datasheet standard deviations
//! - A fixed schedule deciding which sensor fires at each step

use fusion_core::{normalize_angle, Measurement, SensorKind, StateVec};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use sensor_models::{LidarNoise, ObservationModel, RadarNoise, RadarObservation};
use serde::{Deserialize, Serialize};

/// Which sensor fires at each step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum SensorSchedule {
    /// Lidar on even steps, radar on odd steps
    Alternating,
    LidarOnly,
    RadarOnly,
}

impl SensorSchedule {
    pub fn sensor_at(self, step: u64) -> SensorKind {
        match self {
            SensorSchedule::Alternating if step % 2 == 0 => SensorKind::Lidar,
            SensorSchedule::Alternating => SensorKind::Radar,
            SensorSchedule::LidarOnly => SensorKind::Lidar,
            SensorSchedule::RadarOnly => SensorKind::Radar,
        }
    }
}

/// Generates measurements from the true state.
pub struct SensorSimulator {
    lidar: LidarNoise,
    radar: RadarObservation,
    schedule: SensorSchedule,
    rng: ChaCha8Rng,
}

impl SensorSimulator {
    pub fn new(lidar: LidarNoise, radar: RadarNoise, schedule: SensorSchedule, seed: u64) -> Self {
        Self {
            lidar,
            radar: RadarObservation::new(radar),
            schedule,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Measure `truth` at step `step`, stamped `timestamp_us`.
    pub fn measure(&mut self, truth: &StateVec, step: u64, timestamp_us: u64) -> Measurement {
        match self.schedule.sensor_at(step) {
            SensorKind::Lidar => {
                let px = truth[0] + self.gaussian(self.lidar.std_px);
                let py = truth[1] + self.gaussian(self.lidar.std_py);
                Measurement::lidar(px, py, timestamp_us)
            }
            SensorKind::Radar => {
                let z = self.radar.apply(truth);
                let noise = self.radar.noise;
                let rho = (z[0] + self.gaussian(noise.std_rho)).abs();
                let phi = normalize_angle(z[1] + self.gaussian(noise.std_phi));
                let rho_dot = z[2] + self.gaussian(noise.std_rho_dot);
                Measurement::radar(rho, phi, rho_dot, timestamp_us)
            }
        }
    }

    fn gaussian(&mut self, std: f64) -> f64 {
        let n: f64 = self.rng.sample(StandardNormal);
        std * n
    }
}
