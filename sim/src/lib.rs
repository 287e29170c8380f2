//! `sim`: scenario simulator with ground truth, lidar/radar measurements and replay.

pub mod evaluation;
pub mod replay;
pub mod scenarios;
pub mod sensor_sim;
pub mod target;

pub use evaluation::{evaluate, Evaluation};
pub use replay::{load_replay, save_replay, GroundTruthFrame, ReplayLog};
pub use scenarios::{Scenario, ScenarioKind};
pub use sensor_sim::{SensorSchedule, SensorSimulator};
pub use target::{GroundTruth, MotionSpec};
