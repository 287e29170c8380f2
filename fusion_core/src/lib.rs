//! `fusion_core`: CTRV unscented Kalman filter for lidar/radar fusion.
//!
//! # Module layout
//! - [`types`]: Dimensions, state aliases, measurements
//! - [`angle`]: Angle wrap-around
//! - [`ctrv`]: CTRV process model and its noise
//! - [`sigma`]: Augmented sigma points and recombination
//! - [`kf`]: Linear (lidar) update
//! - [`ukf`]: Unscented (radar) update
//! - [`estimator`]: The stateful estimator driving predict/update per measurement
//! - [`error`]: Error type
//! - [`metrics`]: RMSE and NIS statistics

pub mod angle;
pub mod ctrv;
pub mod error;
pub mod estimator;
pub mod kf;
pub mod metrics;
pub mod sigma;
pub mod types;
pub mod ukf;

pub use angle::normalize_angle;
pub use ctrv::{Motion, ProcessNoise, YAW_RATE_EPSILON};
pub use error::{FusionError, FusionResult};
pub use estimator::{CtrvUkf, FilterStatus, StepReport, UkfConfig};
pub use metrics::{NisStats, RmseAccumulator};
pub use types::{velocity_xy, Measurement, SensorKind, StateCov, StateVec};
