//! Ground-truth trajectory of the tracked object.
//!
//! The true state is the CTRV state [px, py, v, yaw, yaw_rate], propagated
//! exactly (no process noise). A `MotionSpec` decides the yaw rate in force at
//! each time.

use fusion_core::{normalize_angle, velocity_xy, Motion, StateVec};
use serde::{Deserialize, Serialize};

/// How the yaw rate evolves over time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Keep the initial speed and yaw rate.
    Constant,
    /// Switch yaw rate at given times.
    /// `segments` is sorted by time ascending: [(t_start, yaw_rate), ...].
    /// The active yaw rate is that of the last segment whose t_start <= t.
    Segmented { segments: Vec<(f64, f64)> },
}

/// The true object state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroundTruth {
    /// [px, py, v, yaw, yaw_rate]
    pub state: [f64; 5],
    pub motion: MotionSpec,
}

impl GroundTruth {
    pub fn new(px: f64, py: f64, v: f64, yaw: f64, yaw_rate: f64, motion: MotionSpec) -> Self {
        Self {
            state: [px, py, v, normalize_angle(yaw), yaw_rate],
            motion,
        }
    }

    /// Propagate from time `t` by `dt` seconds.
    pub fn step(&mut self, t: f64, dt: f64) {
        if let MotionSpec::Segmented { segments } = &self.motion {
            if let Some((_, rate)) = segments.iter().filter(|(start, _)| *start <= t).last() {
                self.state[4] = *rate;
            }
        }

        let [px, py, v, yaw, yaw_rate] = self.state;
        let (dx, dy) = Motion::for_yaw_rate(yaw_rate).displacement(v, yaw, yaw_rate, dt);
        self.state = [
            px + dx,
            py + dy,
            v,
            normalize_angle(yaw + yaw_rate * dt),
            yaw_rate,
        ];
    }

    pub fn state_vec(&self) -> StateVec {
        StateVec::from(self.state)
    }

    /// True velocity (vx, vy).
    pub fn velocity_xy(&self) -> (f64, f64) {
        velocity_xy(&self.state_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn straight_line() {
        let mut gt = GroundTruth::new(0.0, 0.0, 2.0, FRAC_PI_2, 0.0, MotionSpec::Constant);
        for k in 0..10 {
            gt.step(k as f64 * 0.1, 0.1);
        }
        assert_abs_diff_eq!(gt.state[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(gt.state[1], 2.0, epsilon = 1e-12);
        let (vx, vy) = gt.velocity_xy();
        assert_abs_diff_eq!(vx, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vy, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn full_circle_returns_to_start() {
        let rate = 0.5;
        let mut gt = GroundTruth::new(3.0, -1.0, 4.0, 0.2, rate, MotionSpec::Constant);
        let steps = 400;
        let dt = 2.0 * PI / rate / steps as f64;
        for k in 0..steps {
            gt.step(k as f64 * dt, dt);
        }
        assert_abs_diff_eq!(gt.state[0], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(gt.state[1], -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(normalize_angle(gt.state[3] - 0.2), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn segments_switch_yaw_rate() {
        let motion = MotionSpec::Segmented {
            segments: vec![(0.0, 0.3), (1.0, -0.3)],
        };
        let mut gt = GroundTruth::new(0.0, 0.0, 1.0, 0.0, 0.0, motion);
        gt.step(0.0, 0.5);
        assert_eq!(gt.state[4], 0.3);
        gt.step(1.0, 0.5);
        assert_eq!(gt.state[4], -0.3);
        assert_abs_diff_eq!(gt.state[3], 0.0, epsilon = 1e-12);
    }
}
