//! Error types for the fusion estimator.

use crate::types::SensorKind;
use thiserror::Error;

/// Errors surfaced by [`crate::CtrvUkf`].
///
/// Numerical variants poison the estimator; input variants leave it untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error("{sensor} measurement has {actual} values, expected {expected}")]
    MalformedMeasurement {
        sensor: SensorKind,
        expected: usize,
        actual: usize,
    },

    #[error("{sensor} measurement contains a non-finite value")]
    NonFiniteMeasurement { sensor: SensorKind },

    #[error("timestamp {current}us is not after the previous {previous}us")]
    NonMonotonicTimestamp { previous: u64, current: u64 },

    #[error("time step {dt}s must be positive and finite")]
    InvalidTimeStep { dt: f64 },

    #[error("estimator has not been initialized")]
    NotInitialized,

    #[error("augmented covariance is not positive definite")]
    CovarianceNotPositiveDefinite,

    #[error("{sensor} innovation covariance is singular")]
    SingularInnovationCovariance { sensor: SensorKind },

    #[error("update produced a non-finite state")]
    NonFiniteState,

    #[error("estimator diverged earlier and must be reset")]
    Diverged,
}

impl FusionError {
    /// True for numerical failures that leave the estimate untrustworthy.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            FusionError::CovarianceNotPositiveDefinite
                | FusionError::SingularInnovationCovariance { .. }
                | FusionError::NonFiniteState
        )
    }
}

pub type FusionResult<T> = Result<T, FusionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_numerical_failures_poison() {
        assert!(FusionError::CovarianceNotPositiveDefinite.is_numerical());
        assert!(FusionError::NonFiniteState.is_numerical());
        assert!(FusionError::SingularInnovationCovariance {
            sensor: SensorKind::Radar
        }
        .is_numerical());
        assert!(!FusionError::NonFiniteMeasurement {
            sensor: SensorKind::Lidar
        }
        .is_numerical());
        assert!(!FusionError::NonMonotonicTimestamp {
            previous: 2,
            current: 1
        }
        .is_numerical());
        assert!(!FusionError::Diverged.is_numerical());
    }

    #[test]
    fn messages_name_the_sensor() {
        let err = FusionError::MalformedMeasurement {
            sensor: SensorKind::Radar,
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "radar measurement has 2 values, expected 3");
    }
}
