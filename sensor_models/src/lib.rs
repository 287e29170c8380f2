//! `sensor_models`: Lidar and radar observation models, datasheet noise, polar conversion.

pub mod noise;
pub mod observation;

pub use noise::{LidarNoise, RadarNoise};
pub use observation::{LidarObservation, ObservationModel, RadarObservation, MIN_RANGE};
