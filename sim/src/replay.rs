//! Replay: serialize/deserialize measurement logs for offline analysis.

use crate::sensor_sim::SensorSchedule;
use fusion_core::Measurement;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A full recorded simulation log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayLog {
    pub scenario_name: String,
    pub seed: u64,
    pub schedule: SensorSchedule,
    /// All measurements in chronological order
    pub measurements: Vec<Measurement>,
    /// True state at each measurement time
    pub ground_truth: Vec<GroundTruthFrame>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthFrame {
    pub timestamp_us: u64,
    /// [px, py, v, yaw, yaw_rate]
    pub state: [f64; 5],
}

/// Save a replay log to a JSON file.
pub fn save_replay(log: &ReplayLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a replay log from a JSON file.
pub fn load_replay(path: &Path) -> anyhow::Result<ReplayLog> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let log: ReplayLog = serde_json::from_reader(reader)?;
    Ok(log)
}
