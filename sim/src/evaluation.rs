//! Run the estimator over a recorded log and score it against ground truth.

use crate::replay::ReplayLog;
use fusion_core::{CtrvUkf, FusionError, NisStats, RmseAccumulator, StateVec, StepReport, UkfConfig};
use serde::{Deserialize, Serialize};

/// Steps excluded from RMSE while the estimate settles after initialization.
pub const WARMUP_STEPS: usize = 20;

/// Outcome of one run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Evaluation {
    pub rmse: RmseAccumulator,
    pub nis: NisStats,
    /// Measurements fused (predict + update)
    pub updates: u64,
    /// Measurements from disabled sensor kinds: predicted, not corrected
    pub predicted_only: u64,
    /// Measurements rejected as malformed or out of order
    pub rejected: u64,
    /// Numerical failures; the estimator is reset after each
    pub divergences: u64,
    /// Final estimate [px, py, v, yaw, yaw_rate]
    pub final_state: [f64; 5],
}

impl Evaluation {
    /// RMSE of [px, py, vx, vy].
    pub fn rmse(&self) -> [f64; 4] {
        self.rmse.rmse()
    }

    pub fn merge(&mut self, other: &Evaluation) {
        self.rmse.merge(&other.rmse);
        self.nis.merge(&other.nis);
        self.updates += other.updates;
        self.predicted_only += other.predicted_only;
        self.rejected += other.rejected;
        self.divergences += other.divergences;
    }
}

/// Feed every measurement of `log` through a fresh estimator.
///
/// Ground-truth frames are matched to measurements by index.
pub fn evaluate(log: &ReplayLog, config: &UkfConfig) -> Evaluation {
    let mut ukf = CtrvUkf::new(config.clone());
    let mut eval = Evaluation::default();

    for (k, m) in log.measurements.iter().enumerate() {
        match ukf.process_measurement(m) {
            Ok(StepReport::Updated { sensor, nis, .. }) => {
                eval.updates += 1;
                eval.nis.add(sensor, nis);
            }
            Ok(StepReport::Predicted { .. }) => eval.predicted_only += 1,
            Ok(StepReport::Initialized { .. }) => {}
            Err(e) if e.is_numerical() || e == FusionError::Diverged => {
                eval.divergences += 1;
                ukf.reset();
            }
            Err(_) => eval.rejected += 1,
        }

        if k >= WARMUP_STEPS && ukf.is_initialized() {
            if let Some(gt) = log.ground_truth.get(k) {
                eval.rmse.add(ukf.state(), &StateVec::from(gt.state));
            }
        }
    }

    eval.final_state = (*ukf.state()).into();
    eval
}
