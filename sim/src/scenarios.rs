//! Scenario definitions.
//!
//! Each scenario is a named trajectory measured by a lidar/radar schedule.
//! All scenarios are deterministic given the same seed.

use crate::{
    replay::{GroundTruthFrame, ReplayLog},
    sensor_sim::{SensorSchedule, SensorSimulator},
    target::{GroundTruth, MotionSpec},
};
use sensor_models::{LidarNoise, RadarNoise};
use serde::{Deserialize, Serialize};

/// Which pre-defined scenario to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Constant velocity along a straight line
    StraightLine,
    /// Constant speed on a circle of radius 20 m
    ConstantTurn,
    /// Left turn, long right turn, left turn again
    SCurve,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    /// Interval between measurements (µs)
    pub dt_us: u64,
    /// Number of steps after the first measurement
    pub steps: u64,
    pub truth: GroundTruth,
    pub schedule: SensorSchedule,
    pub lidar: LidarNoise,
    pub radar: RadarNoise,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        let (name, truth) = match kind {
            ScenarioKind::StraightLine => (
                "straight_line",
                GroundTruth::new(-10.0, 5.0, 4.0, 0.4, 0.0, MotionSpec::Constant),
            ),
            ScenarioKind::ConstantTurn => (
                "constant_turn",
                GroundTruth::new(10.0, 5.0, 5.0, 0.5, 0.25, MotionSpec::Constant),
            ),
            ScenarioKind::SCurve => (
                "s_curve",
                GroundTruth::new(
                    -20.0,
                    -10.0,
                    5.0,
                    0.0,
                    0.3,
                    MotionSpec::Segmented {
                        segments: vec![(0.0, 0.3), (5.0, -0.3), (15.0, 0.3)],
                    },
                ),
            ),
        };

        Scenario {
            name: name.into(),
            seed,
            dt_us: 50_000,
            steps: 500,
            truth,
            schedule: SensorSchedule::Alternating,
            lidar: LidarNoise::default(),
            radar: RadarNoise::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: SensorSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Run the trajectory and record one measurement per step.
    pub fn generate(&self) -> ReplayLog {
        let mut truth = self.truth.clone();
        let mut sensors = SensorSimulator::new(self.lidar, self.radar, self.schedule, self.seed);
        let dt = self.dt_us as f64 / 1e6;

        let n = self.steps as usize + 1;
        let mut measurements = Vec::with_capacity(n);
        let mut ground_truth = Vec::with_capacity(n);

        for k in 0..=self.steps {
            if k > 0 {
                truth.step((k - 1) as f64 * dt, dt);
            }
            let timestamp_us = k * self.dt_us;
            measurements.push(sensors.measure(&truth.state_vec(), k, timestamp_us));
            ground_truth.push(GroundTruthFrame {
                timestamp_us,
                state: truth.state,
            });
        }

        ReplayLog {
            scenario_name: self.name.clone(),
            seed: self.seed,
            schedule: self.schedule,
            measurements,
            ground_truth,
        }
    }
}
