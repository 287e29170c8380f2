//! `ukf-fusion` CLI: scenario runs, replay import/export, metrics output.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fusion_core::{SensorKind, UkfConfig};
use rayon::prelude::*;
use sim::evaluation::{evaluate, Evaluation};
use sim::replay::{load_replay, save_replay};
use sim::scenarios::{Scenario, ScenarioKind};
use sim::sensor_sim::SensorSchedule;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "ukf-fusion", about = "Lidar/radar fusion with a CTRV unscented Kalman filter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named scenario in batch mode and output metrics.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Number of runs, with seeds seed, seed+1, ...
        #[arg(long, default_value_t = 1)]
        runs: u64,
        /// Which sensor fires at each step
        #[arg(long, value_enum, default_value_t = SensorSchedule::Alternating)]
        schedule: SensorSchedule,
        #[command(flatten)]
        filter: FilterArgs,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the replay log of the first run
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Load and replay a previously recorded scenario log.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Estimator configuration: JSON file plus command-line overrides.
#[derive(Args)]
struct FilterArgs {
    /// UkfConfig JSON file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Longitudinal acceleration noise std dev (m/s²)
    #[arg(long)]
    std_a: Option<f64>,
    /// Yaw acceleration noise std dev (rad/s²)
    #[arg(long)]
    std_yawdd: Option<f64>,
    /// Use lidar measurements for prediction only after initialization
    #[arg(long)]
    no_lidar: bool,
    /// Use radar measurements for prediction only after initialization
    #[arg(long)]
    no_radar: bool,
}

impl FilterArgs {
    fn resolve(&self) -> Result<UkfConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => UkfConfig::default(),
        };
        if let Some(std_a) = self.std_a {
            config.std_a = std_a;
        }
        if let Some(std_yawdd) = self.std_yawdd {
            config.std_yawdd = std_yawdd;
        }
        if self.no_lidar {
            config.use_lidar = false;
        }
        if self.no_radar {
            config.use_radar = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            runs,
            schedule,
            filter,
            output,
            save_replay: save_path,
        } => {
            let config = filter.resolve()?;
            run_scenario(
                scenario,
                seed,
                runs,
                schedule,
                &config,
                output.as_deref(),
                save_path.as_deref(),
            )?;
        }
        Commands::Replay {
            input,
            filter,
            output,
        } => {
            let config = filter.resolve()?;
            run_replay(&input, &config, output.as_deref())?;
        }
    }

    Ok(())
}

fn run_scenario(
    kind: ScenarioKind,
    seed: u64,
    runs: u64,
    schedule: SensorSchedule,
    config: &UkfConfig,
    output_path: Option<&Path>,
    replay_path: Option<&Path>,
) -> Result<()> {
    let base = Scenario::build(kind, seed).with_schedule(schedule);
    println!(
        "Running scenario '{}' (seed={}, runs={}, steps={}, schedule={:?})...",
        base.name, seed, runs, base.steps, schedule
    );

    let start = std::time::Instant::now();

    // One independent estimator per run
    let results: Vec<Evaluation> = (0..runs.max(1))
        .into_par_iter()
        .map(|i| {
            let log = Scenario::build(kind, seed.wrapping_add(i))
                .with_schedule(schedule)
                .generate();
            evaluate(&log, config)
        })
        .collect();

    let mut total = Evaluation::default();
    for r in &results {
        total.merge(r);
    }
    let elapsed = start.elapsed();
    print_summary(&total, elapsed.as_secs_f64());

    // Save replay if requested
    if let Some(rpath) = replay_path {
        save_replay(&base.generate(), rpath)?;
        println!("Replay saved to {}", rpath.display());
    }

    // Output metrics
    if let Some(opath) = output_path {
        let json = metrics_json(&base.name, seed, runs, config, &total, elapsed.as_secs_f64());
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    Ok(())
}

fn run_replay(input: &Path, config: &UkfConfig, output_path: Option<&Path>) -> Result<()> {
    let log = load_replay(input).with_context(|| format!("loading {}", input.display()))?;
    println!(
        "Replaying '{}' ({} measurements)...",
        log.scenario_name,
        log.measurements.len()
    );

    let start = std::time::Instant::now();
    let eval = evaluate(&log, config);
    let elapsed = start.elapsed();
    print_summary(&eval, elapsed.as_secs_f64());

    if let Some(opath) = output_path {
        let json = metrics_json(&log.scenario_name, log.seed, 1, config, &eval, elapsed.as_secs_f64());
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    Ok(())
}

fn print_summary(eval: &Evaluation, elapsed_s: f64) {
    let [px, py, vx, vy] = eval.rmse();
    info!(
        updates = eval.updates,
        rejected = eval.rejected,
        divergences = eval.divergences,
        "run finished"
    );
    println!(
        "Done: {} updates, {} predicted only, {} rejected, {} divergences, elapsed={:.3}s",
        eval.updates, eval.predicted_only, eval.rejected, eval.divergences, elapsed_s
    );
    println!("RMSE: px={px:.4} py={py:.4} vx={vx:.4} vy={vy:.4}");
    for sensor in [SensorKind::Lidar, SensorKind::Radar] {
        let counts = eval.nis.counts(sensor);
        if counts.n_samples > 0 {
            println!(
                "NIS {sensor}: mean={:.3}, {:.1}% above 95% bound",
                counts.mean(),
                100.0 * counts.fraction_above()
            );
        }
    }
}

fn metrics_json(
    scenario: &str,
    seed: u64,
    runs: u64,
    config: &UkfConfig,
    eval: &Evaluation,
    elapsed_s: f64,
) -> serde_json::Value {
    let [px, py, vx, vy] = eval.rmse();
    serde_json::json!({
        "scenario": scenario,
        "seed": seed,
        "runs": runs,
        "elapsed_s": elapsed_s,
        "config": config,
        "rmse": { "px": px, "py": py, "vx": vx, "vy": vy },
        "nis": {
            "lidar_mean": eval.nis.lidar.mean(),
            "lidar_above_95": eval.nis.lidar.fraction_above(),
            "radar_mean": eval.nis.radar.mean(),
            "radar_above_95": eval.nis.radar.fraction_above(),
        },
        "updates": eval.updates,
        "predicted_only": eval.predicted_only,
        "rejected": eval.rejected,
        "divergences": eval.divergences,
    })
}
