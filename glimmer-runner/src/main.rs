use clap::{Parser, ValueEnum};
use crossbeam_channel::{bounded, Receiver};
use glimmer_config::{load_config, ConfigError};
use glimmer_core::CycleReport;
use glimmer_simulation::{Scene, SceneError};
use hdrhistogram::{CreationError, Histogram};
use log::{error, info, warn, LevelFilter};
use serde::Serialize;
use spin_sleep::LoopHelper;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scene configuration file (.json or .toml)
    #[arg(short, long, default_value = "glimmer.json")]
    config: PathBuf,

    /// Number of frames to run, overriding the config
    #[arg(short, long)]
    frames: Option<u64>,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Error, Debug)]
enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build scene: {0}")]
    Scene(#[from] SceneError),

    #[error("Failed to install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Failed to create histogram: {0}")]
    Histogram(#[from] CreationError),
}

/// Totals reported when the run ends
#[derive(Debug, Default, Serialize)]
struct RunSummary {
    frames: u64,
    cycles: u64,
    ignored_frames: u64,
    renders: u64,
    skipped: u64,
    attractions: u64,
    live_particles: usize,
    cycle_mean_us: f64,
    cycle_p99_us: u64,
    cycle_max_us: u64,
    /// Report of the most recent cycle that ran
    last_cycle: Option<CycleReport>,
}

struct Stats {
    cycle_times: Histogram<u64>,
    summary: RunSummary,
}

impl Stats {
    fn new() -> Result<Self, CreationError> {
        Ok(Self {
            // Microseconds, up to one minute
            cycle_times: Histogram::new_with_bounds(1, 60_000_000, 3)?,
            summary: RunSummary::default(),
        })
    }

    fn record(&mut self, report: Option<&CycleReport>) {
        self.summary.frames += 1;
        let Some(report) = report else {
            self.summary.ignored_frames += 1;
            return;
        };
        self.summary.cycles += 1;
        self.summary.renders += report.renders() as u64;
        self.summary.skipped += report.skipped as u64;
        self.summary.attractions += report.attractions as u64;
        let micros = u64::try_from(report.elapsed.as_micros()).unwrap_or(u64::MAX);
        self.cycle_times.saturating_record(micros.max(1));
        self.summary.last_cycle = Some(report.clone());
    }

    fn log_interval(&self, rate: f64, scene: &Scene) {
        info!(
            "{:.1} fps | frame {} | cycle p50 {}us p99 {}us | {} live particles",
            rate,
            self.summary.frames,
            self.cycle_times.value_at_quantile(0.5),
            self.cycle_times.value_at_quantile(0.99),
            scene.live_particles()
        );
    }

    fn finish(mut self, scene: &Scene) -> RunSummary {
        self.summary.live_particles = scene.live_particles();
        if self.cycle_times.len() > 0 {
            self.summary.cycle_mean_us = self.cycle_times.mean();
            self.summary.cycle_p99_us = self.cycle_times.value_at_quantile(0.99);
            self.summary.cycle_max_us = self.cycle_times.max();
        }
        self.summary
    }
}

fn shutdown_channel() -> Result<Receiver<()>, ctrlc::Error> {
    let (tx, rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })?;
    Ok(rx)
}

fn run(args: Args) -> Result<(), RunnerError> {
    let config = load_config(&args.config)?;
    info!("Using configuration from {}", args.config.display());

    let scene = Scene::from_config(&config)?;
    let shutdown = shutdown_channel()?;
    let mut stats = Stats::new()?;

    let frame_limit = args.frames.or(config.frames);
    let frame_budget = Duration::from_secs_f64(1.0 / f64::from(config.framerate));
    let dt = frame_budget.as_secs_f32();
    let mut loop_helper = LoopHelper::builder()
        .report_interval_s(1.0)
        .build_with_target_rate(f64::from(config.framerate));

    match frame_limit {
        Some(limit) => info!("Running {} frames at {} FPS...", limit, config.framerate),
        None => info!("Running at {} FPS until interrupted...", config.framerate),
    }

    let mut frame_index = 0u64;
    loop {
        if shutdown.try_recv().is_ok() {
            info!("Interrupted, shutting down");
            break;
        }
        if frame_limit.map_or(false, |limit| frame_index >= limit) {
            break;
        }

        loop_helper.loop_start();
        frame_index += 1;
        let frame_start = Instant::now();

        let report = scene.frame(frame_index, dt, config.triggers_per_frame);
        stats.record(report.as_ref());

        let elapsed = frame_start.elapsed();
        if elapsed > frame_budget {
            warn!("Frame {} exceeded budget: {:?} > {:?}", frame_index, elapsed, frame_budget);
        }
        if let Some(rate) = loop_helper.report_rate() {
            stats.log_interval(rate, &scene);
        }

        loop_helper.loop_sleep();
    }

    let summary = stats.finish(&scene);
    match serde_json::to_string(&summary) {
        Ok(json) => info!("Run complete: {}", json),
        Err(e) => warn!("Failed to serialize run summary: {}", e),
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level.into())
        .parse_default_env()
        .init();

    info!("Glimmer Runner");

    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}
