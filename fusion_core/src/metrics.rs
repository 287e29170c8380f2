//! Estimation metrics: RMSE against ground truth and NIS consistency counts.

use crate::types::{velocity_xy, SensorKind, StateVec};
use serde::{Deserialize, Serialize};

/// χ² 95% quantile for 2 degrees of freedom (lidar NIS).
pub const CHI2_95_2DOF: f64 = 5.991;
/// χ² 95% quantile for 3 degrees of freedom (radar NIS).
pub const CHI2_95_3DOF: f64 = 7.815;

/// Accumulated squared errors of [px, py, vx, vy].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RmseAccumulator {
    /// Number of (estimate, truth) pairs seen
    pub n_samples: u64,
    /// Per-component sum of squared errors
    pub sum_sq: [f64; 4],
}

impl RmseAccumulator {
    /// Add one estimate/ground-truth pair. Velocity components are derived
    /// from speed and heading on both sides.
    pub fn add(&mut self, estimate: &StateVec, truth: &StateVec) {
        let (evx, evy) = velocity_xy(estimate);
        let (tvx, tvy) = velocity_xy(truth);
        let errors = [
            estimate[0] - truth[0],
            estimate[1] - truth[1],
            evx - tvx,
            evy - tvy,
        ];
        for (acc, e) in self.sum_sq.iter_mut().zip(errors) {
            *acc += e * e;
        }
        self.n_samples += 1;
    }

    /// RMSE of [px, py, vx, vy]; zeros when empty.
    pub fn rmse(&self) -> [f64; 4] {
        if self.n_samples == 0 {
            return [0.0; 4];
        }
        let n = self.n_samples as f64;
        self.sum_sq.map(|s| (s / n).sqrt())
    }

    pub fn merge(&mut self, other: &RmseAccumulator) {
        self.n_samples += other.n_samples;
        for (a, b) in self.sum_sq.iter_mut().zip(other.sum_sq) {
            *a += b;
        }
    }
}

/// NIS samples of one sensor kind.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NisCounts {
    pub n_samples: u64,
    /// Samples above the χ² 95% threshold
    pub n_above: u64,
    pub sum: f64,
}

impl NisCounts {
    fn add(&mut self, nis: f64, threshold: f64) {
        self.n_samples += 1;
        self.sum += nis;
        if nis > threshold {
            self.n_above += 1;
        }
    }

    /// Fraction of samples above the 95% threshold. About 0.05 for a
    /// consistent filter.
    pub fn fraction_above(&self) -> f64 {
        if self.n_samples == 0 {
            0.0
        } else {
            self.n_above as f64 / self.n_samples as f64
        }
    }

    /// Mean NIS; close to the measurement dimension for a consistent filter.
    pub fn mean(&self) -> f64 {
        if self.n_samples == 0 {
            0.0
        } else {
            self.sum / self.n_samples as f64
        }
    }

    fn merge(&mut self, other: &NisCounts) {
        self.n_samples += other.n_samples;
        self.n_above += other.n_above;
        self.sum += other.sum;
    }
}

/// NIS consistency statistics per sensor kind.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NisStats {
    pub lidar: NisCounts,
    pub radar: NisCounts,
}

impl NisStats {
    pub fn threshold(sensor: SensorKind) -> f64 {
        match sensor {
            SensorKind::Lidar => CHI2_95_2DOF,
            SensorKind::Radar => CHI2_95_3DOF,
        }
    }

    pub fn add(&mut self, sensor: SensorKind, nis: f64) {
        let threshold = Self::threshold(sensor);
        self.counts_mut(sensor).add(nis, threshold);
    }

    pub fn counts(&self, sensor: SensorKind) -> &NisCounts {
        match sensor {
            SensorKind::Lidar => &self.lidar,
            SensorKind::Radar => &self.radar,
        }
    }

    fn counts_mut(&mut self, sensor: SensorKind) -> &mut NisCounts {
        match sensor {
            SensorKind::Lidar => &mut self.lidar,
            SensorKind::Radar => &mut self.radar,
        }
    }

    pub fn merge(&mut self, other: &NisStats) {
        self.lidar.merge(&other.lidar);
        self.radar.merge(&other.radar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rmse_of_constant_offset() {
        let mut acc = RmseAccumulator::default();
        assert_eq!(acc.rmse(), [0.0; 4]);
        let truth = StateVec::new(0.0, 0.0, 2.0, 0.0, 0.0);
        let est = StateVec::new(0.3, -0.4, 3.0, 0.0, 0.0);
        for _ in 0..10 {
            acc.add(&est, &truth);
        }
        let rmse = acc.rmse();
        assert_abs_diff_eq!(rmse[0], 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(rmse[1], 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(rmse[2], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rmse[3], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn velocity_error_uses_heading() {
        let mut acc = RmseAccumulator::default();
        // Same speed, opposite headings: vx error is 2v
        acc.add(
            &StateVec::new(0.0, 0.0, 1.5, std::f64::consts::PI, 0.0),
            &StateVec::new(0.0, 0.0, 1.5, 0.0, 0.0),
        );
        assert_abs_diff_eq!(acc.rmse()[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn merged_accumulators_pool_samples() {
        let truth = StateVec::zeros();
        let mut a = RmseAccumulator::default();
        let mut b = RmseAccumulator::default();
        a.add(&StateVec::new(1.0, 0.0, 0.0, 0.0, 0.0), &truth);
        b.add(&StateVec::new(3.0, 0.0, 0.0, 0.0, 0.0), &truth);
        a.merge(&b);
        assert_eq!(a.n_samples, 2);
        assert_abs_diff_eq!(a.rmse()[0], 5.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn nis_thresholds_per_sensor() {
        let mut stats = NisStats::default();
        stats.add(SensorKind::Lidar, 6.5);
        stats.add(SensorKind::Lidar, 1.0);
        // Above the 2-dof threshold but below the 3-dof one
        stats.add(SensorKind::Radar, 6.5);
        stats.add(SensorKind::Radar, 9.0);

        assert_abs_diff_eq!(stats.counts(SensorKind::Lidar).fraction_above(), 0.5);
        assert_abs_diff_eq!(stats.counts(SensorKind::Lidar).mean(), 3.75);
        assert_eq!(stats.radar.n_above, 1);
        assert_eq!(NisCounts::default().fraction_above(), 0.0);
    }
}
